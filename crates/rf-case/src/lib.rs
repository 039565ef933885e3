//! rf-case: case file format and validation.

pub mod schema;
pub mod templates;
pub mod validate;

use std::path::{Path, PathBuf};

pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_case};

/// Case file names looked up in a case directory, in order.
pub const CASE_FILE_NAMES: [&str; 2] = ["case.yaml", "case.json"];

pub type CaseResult<T> = Result<T, CaseError>;

#[derive(thiserror::Error, Debug)]
pub enum CaseError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("No case file in {dir}")]
    NotFound { dir: PathBuf },

    #[error("Unknown case file extension: {path}")]
    UnknownFormat { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn from_yaml_str(content: &str) -> CaseResult<Case> {
    let case: Case = serde_yaml::from_str(content)?;
    validate_case(&case)?;
    Ok(case)
}

pub fn from_json_str(content: &str) -> CaseResult<Case> {
    let case: Case = serde_json::from_str(content)?;
    validate_case(&case)?;
    Ok(case)
}

pub fn load_yaml(path: &Path) -> CaseResult<Case> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn save_yaml(path: &Path, case: &Case) -> CaseResult<()> {
    validate_case(case)?;
    let content = serde_yaml::to_string(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> CaseResult<Case> {
    let content = std::fs::read_to_string(path)?;
    from_json_str(&content)
}

pub fn save_json(path: &Path, case: &Case) -> CaseResult<()> {
    validate_case(case)?;
    let content = serde_json::to_string_pretty(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension (`.yaml`/`.yml` or `.json`).
pub fn load(path: &Path) -> CaseResult<Case> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => load_yaml(path),
        Some("json") => load_json(path),
        _ => Err(CaseError::UnknownFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Path of the case file inside a case directory.
pub fn find_case_file(dir: &Path) -> CaseResult<PathBuf> {
    CASE_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| CaseError::NotFound {
            dir: dir.to_path_buf(),
        })
}

/// Load the case file of a case directory.
pub fn load_case_dir(dir: &Path) -> CaseResult<Case> {
    load(&find_case_file(dir)?)
}
