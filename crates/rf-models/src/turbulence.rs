//! Turbulence closures for the relative-velocity momentum equation.

use rf_core::{Tensor, Vec3, dev, symm};
use rf_fvm::{FvMatrix, VolVectorField, fvc, fvm};
use rf_mesh::Mesh;

use crate::error::{ModelError, ModelResult};

/// Closure supplying the effective viscosity and the divergence of the
/// effective deviatoric stress.
pub trait TurbulenceModel: Send + Sync {
    /// Model name for logging.
    fn name(&self) -> &str;

    /// Laminar kinematic viscosity.
    fn nu(&self) -> f64;

    /// Turbulent viscosity per cell.
    fn nut(&self) -> &[f64];

    /// `nu + nut` per cell.
    fn nu_eff(&self) -> Vec<f64> {
        self.nut().iter().map(|nut| self.nu() + nut).collect()
    }

    /// `-laplacian(nuEff, U) - div(nuEff dev(T(grad U)))`.
    ///
    /// The Laplacian is implicit; the transpose part is evaluated from the
    /// current velocity and enters as an explicit left-hand source.
    fn div_dev_reff(&self, mesh: &Mesh, u: &VolVectorField) -> ModelResult<FvMatrix<Vec3>> {
        let nu_eff = self.nu_eff();
        let nu_eff_f = fvc::interpolate_cells(mesh, &nu_eff);
        let mut m = -fvm::laplacian(mesh, &nu_eff_f, u)?;

        let grad_u = fvc::grad_vector(mesh, u);
        let stress: Vec<Tensor> = grad_u
            .iter()
            .zip(&nu_eff)
            .map(|(g, nu)| dev(&g.transpose()) * *nu)
            .collect();
        let stress_f = fvc::interpolate_tensors(mesh, &stress);
        let explicit: Vec<Vec3> = fvc::div_tensor_flux(mesh, &stress_f)
            .into_iter()
            .map(|d| -d)
            .collect();
        m.add_explicit_lhs(mesh, &explicit)?;
        Ok(m)
    }

    /// Update the closure from the latest velocity.
    fn correct(&mut self, mesh: &Mesh, u: &VolVectorField) -> ModelResult<()>;
}

/// No turbulence: `nut = 0`.
#[derive(Debug, Clone)]
pub struct Laminar {
    nu: f64,
    nut: Vec<f64>,
}

impl Laminar {
    pub fn new(mesh: &Mesh, nu: f64) -> ModelResult<Self> {
        check_nu("laminar", nu)?;
        Ok(Self {
            nu,
            nut: vec![0.0; mesh.n_cells()],
        })
    }
}

impl TurbulenceModel for Laminar {
    fn name(&self) -> &str {
        "laminar"
    }

    fn nu(&self) -> f64 {
        self.nu
    }

    fn nut(&self) -> &[f64] {
        &self.nut
    }

    fn correct(&mut self, _mesh: &Mesh, _u: &VolVectorField) -> ModelResult<()> {
        Ok(())
    }
}

/// Smagorinsky LES closure, `nut = (Cs delta)^2 |S|` with
/// `delta = V^(1/3)` and `|S| = sqrt(2 S:S)`.
#[derive(Debug, Clone)]
pub struct Smagorinsky {
    nu: f64,
    cs: f64,
    delta: Vec<f64>,
    nut: Vec<f64>,
}

impl Smagorinsky {
    pub const DEFAULT_CS: f64 = 0.17;

    pub fn new(mesh: &Mesh, nu: f64, cs: f64) -> ModelResult<Self> {
        check_nu("Smagorinsky", nu)?;
        if !(cs.is_finite() && cs > 0.0) {
            return Err(ModelError::invalid("Smagorinsky", "Cs must be positive"));
        }
        Ok(Self {
            nu,
            cs,
            delta: mesh.cell_volumes().iter().map(|v| v.cbrt()).collect(),
            nut: vec![0.0; mesh.n_cells()],
        })
    }

    pub fn cs(&self) -> f64 {
        self.cs
    }
}

impl TurbulenceModel for Smagorinsky {
    fn name(&self) -> &str {
        "Smagorinsky"
    }

    fn nu(&self) -> f64 {
        self.nu
    }

    fn nut(&self) -> &[f64] {
        &self.nut
    }

    fn correct(&mut self, mesh: &Mesh, u: &VolVectorField) -> ModelResult<()> {
        let grad_u = fvc::grad_vector(mesh, u);
        for ((nut, g), delta) in self.nut.iter_mut().zip(&grad_u).zip(&self.delta) {
            let s = symm(g);
            let mag_s = (2.0 * s.norm_squared()).sqrt();
            *nut = (self.cs * delta).powi(2) * mag_s;
        }
        tracing::debug!(
            "Smagorinsky: max nut = {:e}",
            self.nut.iter().cloned().fold(0.0, f64::max)
        );
        Ok(())
    }
}

fn check_nu(model: &str, nu: f64) -> ModelResult<()> {
    if nu.is_finite() && nu > 0.0 {
        Ok(())
    } else {
        Err(ModelError::invalid(model, format!("nu = {nu} must be positive")))
    }
}
