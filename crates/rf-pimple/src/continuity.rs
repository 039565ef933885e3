//! Continuity error diagnostics of the corrected flux.

use rf_fvm::fvc;
use rf_mesh::Mesh;

/// Time-step continuity errors, normalised by the total volume:
/// `dt * sum(|div phi| V) / sum(V)` for the local error and the signed
/// equivalent for the global one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContinuityErrors {
    pub sum_local: f64,
    pub global: f64,
    /// Sum of `global` over every pressure corrector of the run.
    pub cumulative: f64,
}

impl ContinuityErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the errors of `phi` and add the global one to the running
    /// total.
    pub fn update(&mut self, mesh: &Mesh, phi: &[f64], delta_t: f64) {
        let div = fvc::div(mesh, phi);
        let total_volume = mesh.total_volume();
        let (local, global) = div
            .iter()
            .zip(mesh.cell_volumes())
            .fold((0.0, 0.0), |(l, g), (d, v)| (l + d.abs() * v, g + d * v));
        self.sum_local = delta_t * local / total_volume;
        self.global = delta_t * global / total_volume;
        self.cumulative += self.global;
        tracing::info!(
            "time step continuity errors : sum local = {:e}, global = {:e}, cumulative = {:e}",
            self.sum_local,
            self.global,
            self.cumulative
        );
    }
}
