//! Error types for the rf-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// provides one error surface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Case error: {0}")]
    Case(String),

    #[error("Case directory not found: {path}")]
    CaseDirMissing { path: PathBuf },

    #[error("Runtime compilation failed: {0}")]
    Compile(String),

    #[error("Initial fields missing at time {time}: {message} (run `rotaflow init` first)")]
    FieldsMissing { time: String, message: String },

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rf-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<rf_case::CaseError> for AppError {
    fn from(err: rf_case::CaseError) -> Self {
        AppError::Case(err.to_string())
    }
}

impl From<rf_mesh::MeshError> for AppError {
    fn from(err: rf_mesh::MeshError) -> Self {
        AppError::Compile(format!("mesh: {err}"))
    }
}

impl From<rf_fvm::FvmError> for AppError {
    fn from(err: rf_fvm::FvmError) -> Self {
        AppError::Compile(format!("fields: {err}"))
    }
}

impl From<rf_models::ModelError> for AppError {
    fn from(err: rf_models::ModelError) -> Self {
        AppError::Compile(format!("models: {err}"))
    }
}

impl From<rf_pimple::PimpleError> for AppError {
    fn from(err: rf_pimple::PimpleError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<rf_sim::SimError> for AppError {
    fn from(err: rf_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<rf_results::ResultsError> for AppError {
    fn from(err: rf_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
