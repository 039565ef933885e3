//! Solution fields carried from one time step to the next.

use rf_fvm::{SurfaceScalarField, VolScalarField, VolVectorField, fvc};
use rf_mesh::Mesh;
use rf_models::FrameModel;

use crate::error::{PimpleError, PimpleResult};

/// Kinematic pressure, relative and absolute velocity and the face flux,
/// plus the old-time copies the time derivative needs.
#[derive(Debug, Clone)]
pub struct FlowState {
    pub p: VolScalarField,
    pub urel: VolVectorField,
    /// Absolute velocity, recomputed from `urel` after every outer iteration.
    pub u: VolVectorField,
    pub phi: SurfaceScalarField,
    urel_old: VolVectorField,
    phi_old: Vec<f64>,
}

impl FlowState {
    /// Build the state from the initial fields. Without a stored flux the
    /// face flux is interpolated from `urel`.
    pub fn new(
        mesh: &Mesh,
        p: VolScalarField,
        urel: VolVectorField,
        phi: Option<SurfaceScalarField>,
        frame: &dyn FrameModel,
    ) -> PimpleResult<Self> {
        for (name, n) in [("p", p.internal().len()), ("Urel", urel.internal().len())] {
            if n != mesh.n_cells() {
                return Err(PimpleError::configuration(format!(
                    "field {name} has {n} cells, mesh has {}",
                    mesh.n_cells()
                )));
            }
        }
        let phi = match phi {
            Some(phi) => {
                if phi.values().len() != mesh.n_faces() {
                    return Err(PimpleError::configuration(format!(
                        "flux has {} faces, mesh has {}",
                        phi.values().len(),
                        mesh.n_faces()
                    )));
                }
                phi
            }
            None => SurfaceScalarField::new("phi", mesh, fvc::flux(mesh, &urel))?,
        };
        let u = frame.absolute_velocity(mesh, &urel)?;
        Ok(Self {
            urel_old: urel.clone(),
            phi_old: phi.values().to_vec(),
            p,
            urel,
            u,
            phi,
        })
    }

    /// Copy the current relative velocity and flux into the old-time slots.
    pub fn store_old_time(&mut self) {
        self.urel_old.clone_from(&self.urel);
        self.phi_old.copy_from_slice(self.phi.values());
    }

    pub fn urel_old(&self) -> &VolVectorField {
        &self.urel_old
    }

    pub fn phi_old(&self) -> &[f64] {
        &self.phi_old
    }

    pub fn update_absolute_velocity(
        &mut self,
        mesh: &Mesh,
        frame: &dyn FrameModel,
    ) -> PimpleResult<()> {
        self.u = frame.absolute_velocity(mesh, &self.urel)?;
        Ok(())
    }
}
