//! Error types for model setup and evaluation.

use rf_fvm::FvmError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid parameter for {model}: {what}")]
    InvalidParameter { model: String, what: String },

    #[error("Cell selection of '{name}' contains no cells")]
    EmptySelection { name: String },

    #[error("Source '{name}' used before it was constrained")]
    NotConstrained { name: String },

    #[error(transparent)]
    Fvm(#[from] FvmError),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    pub(crate) fn invalid(model: &str, what: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            model: model.to_string(),
            what: what.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::invalid("Smagorinsky", "Cs must be positive");
        assert!(err.to_string().contains("Cs must be positive"));
        let err: ModelError = FvmError::InvalidArg { what: "x".into() }.into();
        assert!(matches!(err, ModelError::Fvm(_)));
    }
}
