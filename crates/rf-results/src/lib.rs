//! rf-results: time directories, step log and run manifest.

pub mod convert;
pub mod hash;
pub mod store;
pub mod types;

use std::path::PathBuf;

pub use convert::StoredValue;
pub use hash::compute_case_hash;
pub use store::FieldStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Field {field} not found at time {time}")]
    FieldNotFound { field: String, time: String },

    #[error("No time directories in {dir}")]
    NoTimes { dir: PathBuf },

    #[error("Field {field} does not fit the mesh: {what}")]
    Mismatch { field: String, what: String },

    #[error("Manifest not found in {dir}")]
    ManifestNotFound { dir: PathBuf },

    #[error(transparent)]
    Fvm(#[from] rf_fvm::FvmError),
}
