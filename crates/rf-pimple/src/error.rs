//! Error types for the pressure-velocity coupling.

use rf_fvm::FvmError;
use rf_mesh::MeshError;
use rf_models::ModelError;
use thiserror::Error;

/// Errors raised while setting up or advancing the coupled solution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PimpleError {
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error("Pressure reference error: {what}")]
    Reference { what: String },

    #[error(
        "Continuity error cannot be removed by adjusting the outflow \
         (total flux {total_flux:e}, inflow {mass_in:e}, fixed outflow {fixed_out:e}, \
         adjustable outflow {adjustable_out:e})"
    )]
    AdjustPhi {
        total_flux: f64,
        mass_in: f64,
        fixed_out: f64,
        adjustable_out: f64,
    },

    #[error(transparent)]
    Fvm(#[from] FvmError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

pub type PimpleResult<T> = Result<T, PimpleError>;

impl PimpleError {
    pub(crate) fn configuration(what: impl Into<String>) -> Self {
        PimpleError::Configuration { what: what.into() }
    }
}
