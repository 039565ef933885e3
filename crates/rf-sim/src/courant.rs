//! Courant number and the adaptive time step.

use rf_core::SMALL;
use rf_fvm::fvc;
use rf_mesh::Mesh;

use crate::error::SimResult;
use crate::runtime::RunTime;

/// Courant number of a face flux over one step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CourantNumber {
    /// Volume-weighted mean over the domain.
    pub mean: f64,
    /// Largest cell value.
    pub max: f64,
}

/// `Co = 0.5 * sum(|phi|) / V * dt` per cell, reported as mean and max.
pub fn courant_number(mesh: &Mesh, phi: &[f64], delta_t: f64) -> CourantNumber {
    if mesh.n_internal_faces() == 0 {
        return CourantNumber::default();
    }
    let sum_phi = fvc::surface_sum_mag(mesh, phi);
    let volumes = mesh.cell_volumes();
    let max = sum_phi
        .iter()
        .zip(volumes)
        .map(|(s, v)| s / v)
        .fold(0.0, f64::max);
    let mean = sum_phi.iter().sum::<f64>() / mesh.total_volume();
    let co = CourantNumber {
        mean: 0.5 * mean * delta_t,
        max: 0.5 * max * delta_t,
    };
    tracing::info!(mean = co.mean, max = co.max, "Courant Number");
    co
}

/// Step size for the first step: scaled down so `max_co` is not exceeded.
pub fn set_initial_delta_t(runtime: &mut RunTime, co: CourantNumber) -> SimResult<()> {
    let cfg = runtime.config();
    if !cfg.adjust_time_step || co.max <= SMALL {
        return Ok(());
    }
    let dt = runtime.delta_t();
    let new_dt = (cfg.max_co * dt / co.max).min(dt.min(cfg.max_delta_t));
    runtime.set_delta_t(new_dt)
}

/// Step size for the next step from the current Courant number. Growth is
/// damped and capped at 20% per step; reduction is immediate.
pub fn set_delta_t(runtime: &mut RunTime, co: CourantNumber) -> SimResult<()> {
    let cfg = runtime.config();
    if !cfg.adjust_time_step {
        return Ok(());
    }
    let max_factor = cfg.max_co / (co.max + SMALL);
    let factor = max_factor.min(1.0 + 0.1 * max_factor).min(1.2);
    let new_dt = (factor * runtime.delta_t()).min(cfg.max_delta_t);
    runtime.set_delta_t(new_dt)?;
    tracing::info!(delta_t = runtime.delta_t(), "deltaT");
    Ok(())
}
