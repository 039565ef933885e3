//! Error types for the time loop.

use rf_pimple::PimpleError;
use thiserror::Error;

/// Errors encountered while advancing a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Observer error: {message}")]
    Observer { message: String },

    #[error(transparent)]
    Pimple(#[from] PimpleError),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        SimError::InvalidArg { what: what.into() }
    }
}
