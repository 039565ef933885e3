//! Mesh-specific error types.

pub type MeshResult<T> = Result<T, MeshError>;

/// Mesh construction and validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// The mesh has no cells.
    NoCells,

    /// A face refers to a cell that doesn't exist.
    InvalidCellRef { face: usize, cell: usize },

    /// An internal face has the same owner and neighbour.
    SelfNeighbour { face: usize },

    /// A cell volume is zero, negative or non-finite.
    NonPositiveVolume { cell: usize, volume: f64 },

    /// A face has a zero or non-finite area vector.
    DegenerateFace { face: usize },

    /// The outward area vectors of a cell do not sum to zero.
    OpenCell { cell: usize, imbalance: f64 },

    /// A cell is not attached to any face.
    OrphanCell { cell: usize },

    /// Two patches share a name.
    DuplicatePatch { name: String },

    /// A face or lookup names a patch that doesn't exist.
    UnknownPatch { name: String },

    /// The same patch name was requested with two different kinds.
    PatchKindConflict { name: String },

    /// Block generator arguments are invalid.
    InvalidBlock { what: &'static str },
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::NoCells => write!(f, "Mesh has no cells"),
            MeshError::InvalidCellRef { face, cell } => {
                write!(f, "Face {} refers to non-existent cell {}", face, cell)
            }
            MeshError::SelfNeighbour { face } => {
                write!(f, "Internal face {} has identical owner and neighbour", face)
            }
            MeshError::NonPositiveVolume { cell, volume } => {
                write!(f, "Cell {} has non-positive volume {}", cell, volume)
            }
            MeshError::DegenerateFace { face } => {
                write!(f, "Face {} has a degenerate area vector", face)
            }
            MeshError::OpenCell { cell, imbalance } => {
                write!(
                    f,
                    "Cell {} is not closed (relative area imbalance {:.3e})",
                    cell, imbalance
                )
            }
            MeshError::OrphanCell { cell } => write!(f, "Cell {} has no faces", cell),
            MeshError::DuplicatePatch { name } => write!(f, "Duplicate patch name '{}'", name),
            MeshError::UnknownPatch { name } => write!(f, "Patch '{}' not found", name),
            MeshError::PatchKindConflict { name } => {
                write!(f, "Patch '{}' requested with conflicting kinds", name)
            }
            MeshError::InvalidBlock { what } => write!(f, "Invalid block: {}", what),
        }
    }
}

impl std::error::Error for MeshError {}
