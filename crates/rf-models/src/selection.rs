//! Cell sets that sources act on.

use rf_core::Vec3;
use rf_mesh::Mesh;

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellSelection {
    #[default]
    All,
    /// Cells whose centre lies in the axis-aligned box.
    Box { min: Vec3, max: Vec3 },
}

impl CellSelection {
    /// Cell indices in ascending order; an empty result is an error.
    pub fn cells(&self, mesh: &Mesh, owner_name: &str) -> ModelResult<Vec<usize>> {
        let cells: Vec<usize> = match self {
            CellSelection::All => (0..mesh.n_cells()).collect(),
            CellSelection::Box { min, max } => mesh
                .cell_centres()
                .iter()
                .enumerate()
                .filter(|(_, c)| (0..3).all(|d| c[d] >= min[d] && c[d] <= max[d]))
                .map(|(i, _)| i)
                .collect(),
        };
        if cells.is_empty() {
            return Err(ModelError::EmptySelection {
                name: owner_name.to_string(),
            });
        }
        Ok(cells)
    }
}
