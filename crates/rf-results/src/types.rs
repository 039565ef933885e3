//! Stored data types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a field is obtained when a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Missing file is an error.
    MustRead,
    /// Missing file yields `None`.
    ReadIfPresent,
    /// Never read; the field is derived.
    NoRead,
}

/// Whether a field is written at write times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    AutoWrite,
    NoWrite,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FieldClass {
    VolScalarField,
    VolVectorField,
    SurfaceScalarField,
}

/// Per-cell, per-face or per-patch-face values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldData {
    Scalar(Vec<f64>),
    Vector(Vec<[f64; 3]>),
}

impl FieldData {
    pub fn len(&self) -> usize {
        match self {
            FieldData::Scalar(v) => v.len(),
            FieldData::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Magnitude of every entry.
    pub fn magnitudes(&self) -> Vec<f64> {
        match self {
            FieldData::Scalar(v) => v.clone(),
            FieldData::Vector(v) => v
                .iter()
                .map(|c| (c[0] * c[0] + c[1] * c[1] + c[2] * c[2]).sqrt())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PatchKindRecord {
    FixedValue,
    ZeroGradient,
    FixedGradient,
    Calculated,
    Empty,
}

/// Boundary definition of one patch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchRecord {
    pub patch: String,
    #[serde(rename = "type")]
    pub kind: PatchKindRecord,
    pub values: FieldData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<FieldData>,
}

/// One field at one time: `<case>/<time>/<name>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldFile {
    pub name: String,
    pub class: FieldClass,
    pub time: String,
    pub internal: FieldData,
    #[serde(default)]
    pub boundary: Vec<PatchRecord>,
}

/// Min, max and volume-unweighted mean of a stored field (magnitudes for
/// vectors).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

impl FieldFile {
    pub fn summary(&self) -> Option<FieldSummary> {
        let values = self.internal.magnitudes();
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(FieldSummary {
            min,
            max,
            mean,
            count: values.len(),
        })
    }
}

/// One line of `log/steps.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    pub time: f64,
    pub delta_t: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courant: Option<f64>,
    pub n_outer: usize,
    pub converged: bool,
    /// First-iteration initial residual per solved field component.
    pub initial_residuals: BTreeMap<String, f64>,
    pub unconverged_solves: usize,
    pub continuity_sum_local: f64,
    pub continuity_global: f64,
    pub continuity_cumulative: f64,
    pub continuity_warning: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed { message: String },
}

/// `run.json` in the case directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub case_name: String,
    /// SHA-256 of the case definition and solver version.
    pub case_hash: String,
    pub solver_version: String,
    /// RFC 3339 timestamps.
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    pub steps: usize,
    #[serde(default)]
    pub written_times: Vec<String>,
    #[serde(flatten)]
    pub status: RunStatus,
}

impl RunManifest {
    /// Manifest of a run starting now.
    pub fn started(
        case_name: impl Into<String>,
        case_hash: impl Into<String>,
        solver_version: impl Into<String>,
        start_time: f64,
        end_time: f64,
    ) -> Self {
        Self {
            case_name: case_name.into(),
            case_hash: case_hash.into(),
            solver_version: solver_version.into(),
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            start_time,
            end_time,
            steps: 0,
            written_times: Vec::new(),
            status: RunStatus::Running,
        }
    }

    /// Stamp the finish time and final status.
    pub fn finish(&mut self, status: RunStatus) {
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
        self.status = status;
    }
}
