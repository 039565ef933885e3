use rf_core::CoreError;
use rf_mesh::MeshError;

pub type FvmResult<T> = Result<T, FvmError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FvmError {
    #[error("Size mismatch for {what}: expected {expected}, got {got}")]
    SizeMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("Patch '{patch}' of field '{field}' is {found}, mesh patch is {expected}")]
    PatchKindMismatch {
        field: String,
        patch: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Calculated patch '{patch}' of field '{field}' cannot enter an implicit operator")]
    CalculatedPatchInMatrix { field: String, patch: String },

    #[error("No solver controls for field '{name}'")]
    MissingSolverControls { name: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}
