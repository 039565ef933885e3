//! Case directory storage: time directories, step log and run manifest.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::{FieldFile, ReadPolicy, RunManifest, StepRecord};
use crate::{ResultsError, ResultsResult};

const LOG_DIR: &str = "log";
const STEPS_FILE: &str = "steps.jsonl";
const MANIFEST_FILE: &str = "run.json";

#[derive(Debug, Clone)]
pub struct FieldStore {
    case_dir: PathBuf,
}

impl FieldStore {
    pub fn new(case_dir: PathBuf) -> ResultsResult<Self> {
        if !case_dir.exists() {
            fs::create_dir_all(&case_dir)?;
        }
        Ok(Self { case_dir })
    }

    pub fn case_dir(&self) -> &Path {
        &self.case_dir
    }

    pub fn time_dir(&self, time_name: &str) -> PathBuf {
        self.case_dir.join(time_name)
    }

    fn field_path(&self, time_name: &str, field: &str) -> PathBuf {
        self.time_dir(time_name).join(format!("{field}.json"))
    }

    pub fn write_field(&self, file: &FieldFile) -> ResultsResult<()> {
        let dir = self.time_dir(&file.time);
        fs::create_dir_all(&dir)?;
        let content = serde_json::to_string(file)?;
        fs::write(self.field_path(&file.time, &file.name), content)?;
        tracing::debug!(field = %file.name, time = %file.time, "field written");
        Ok(())
    }

    /// Read one field according to `policy`.
    pub fn read_field(
        &self,
        time_name: &str,
        field: &str,
        policy: ReadPolicy,
    ) -> ResultsResult<Option<FieldFile>> {
        if policy == ReadPolicy::NoRead {
            return Ok(None);
        }
        let path = self.field_path(time_name, field);
        if !path.is_file() {
            return match policy {
                ReadPolicy::MustRead => Err(ResultsError::FieldNotFound {
                    field: field.to_string(),
                    time: time_name.to_string(),
                }),
                _ => Ok(None),
            };
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Time directories as `(value, name)`, ascending by value.
    pub fn list_times(&self) -> ResultsResult<Vec<(f64, String)>> {
        let mut times = Vec::new();
        if !self.case_dir.exists() {
            return Ok(times);
        }
        for entry in fs::read_dir(&self.case_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Ok(value) = name.parse::<f64>()
                && value.is_finite()
            {
                times.push((value, name));
            }
        }
        times.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(times)
    }

    pub fn latest_time(&self) -> ResultsResult<(f64, String)> {
        self.list_times()?
            .pop()
            .ok_or_else(|| ResultsError::NoTimes {
                dir: self.case_dir.clone(),
            })
    }

    fn steps_path(&self) -> PathBuf {
        self.case_dir.join(LOG_DIR).join(STEPS_FILE)
    }

    /// Truncate the step log.
    pub fn reset_steps(&self) -> ResultsResult<()> {
        fs::create_dir_all(self.case_dir.join(LOG_DIR))?;
        fs::write(self.steps_path(), "")?;
        Ok(())
    }

    pub fn append_step(&self, record: &StepRecord) -> ResultsResult<()> {
        fs::create_dir_all(self.case_dir.join(LOG_DIR))?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.steps_path())?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    pub fn load_steps(&self) -> ResultsResult<Vec<StepRecord>> {
        let path = self.steps_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(line)?);
            }
        }
        Ok(records)
    }

    pub fn write_manifest(&self, manifest: &RunManifest) -> ResultsResult<()> {
        let content = serde_json::to_string_pretty(manifest)?;
        fs::write(self.case_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    pub fn load_manifest(&self) -> ResultsResult<RunManifest> {
        let path = self.case_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(ResultsError::ManifestNotFound {
                dir: self.case_dir.clone(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
