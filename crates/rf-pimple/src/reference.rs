//! Pressure level pinning for closed domains.

use rf_core::Vec3;
use rf_fvm::VolScalarField;
use rf_mesh::Mesh;

use crate::error::{PimpleError, PimpleResult};

/// Where the pressure level is pinned, as configured.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReferenceLocation {
    #[default]
    None,
    Cell(usize),
    Point(Vec3),
}

/// Configured reference: location plus value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReferenceSpec {
    pub location: ReferenceLocation,
    pub value: f64,
}

/// Resolved reference. `cell` is `None` when the boundary conditions
/// already fix the pressure level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReference {
    cell: Option<usize>,
    value: f64,
}

impl PressureReference {
    /// Resolve the reference for `p` on `mesh`.
    ///
    /// A field that needs a reference must be given one that lies in the
    /// mesh. A reference given for a field whose level is already fixed is
    /// ignored with a warning.
    pub fn resolve(mesh: &Mesh, p: &VolScalarField, spec: &ReferenceSpec) -> PimpleResult<Self> {
        if !p.needs_reference() {
            if spec.location != ReferenceLocation::None {
                tracing::warn!(
                    "pressure reference for {} ignored: boundary conditions fix its level",
                    p.name()
                );
            }
            return Ok(Self {
                cell: None,
                value: spec.value,
            });
        }

        if !spec.value.is_finite() {
            return Err(PimpleError::Reference {
                what: format!("non-finite reference value {}", spec.value),
            });
        }
        let cell = match spec.location {
            ReferenceLocation::None => {
                return Err(PimpleError::Reference {
                    what: format!(
                        "{} needs a reference: give pRefCell or pRefPoint",
                        p.name()
                    ),
                });
            }
            ReferenceLocation::Cell(cell) => {
                if cell >= mesh.n_cells() {
                    return Err(PimpleError::Reference {
                        what: format!(
                            "pRefCell {cell} out of range for {} cells",
                            mesh.n_cells()
                        ),
                    });
                }
                cell
            }
            ReferenceLocation::Point(point) => {
                mesh.find_cell(&point).ok_or_else(|| PimpleError::Reference {
                    what: format!(
                        "pRefPoint ({}, {}, {}) is outside the mesh",
                        point.x, point.y, point.z
                    ),
                })?
            }
        };
        tracing::debug!(cell, value = spec.value, "pressure reference");
        Ok(Self {
            cell: Some(cell),
            value: spec.value,
        })
    }

    pub fn cell(&self) -> Option<usize> {
        self.cell
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}
