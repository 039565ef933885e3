//! Per-step and per-outer-iteration diagnostics.

use rf_fvm::SolverPerformance;

use crate::continuity::ContinuityErrors;

/// What happened in one outer iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct OuterIterationReport {
    /// 1-based outer iteration index.
    pub iteration: usize,
    pub final_iteration: bool,
    pub momentum: Vec<SolverPerformance>,
    pub pressure: Vec<SolverPerformance>,
    /// L2 norm of the change of `Urel` over this iteration.
    pub urel_change: f64,
    /// L2 norm of the change of `p` over this iteration.
    pub p_change: f64,
    pub turbulence_corrected: bool,
}

/// Summary of one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub time: f64,
    pub delta_t: f64,
    /// Courant number of the flux entering the step, when the caller
    /// computed it.
    pub courant: Option<f64>,
    pub outer: Vec<OuterIterationReport>,
    /// Residual targets met (with residual control), or every linear solve
    /// of the final outer iteration converged (without).
    pub converged: bool,
    pub continuity: ContinuityErrors,
    /// Continuity error above the warning threshold.
    pub continuity_warning: bool,
}

impl StepReport {
    pub fn n_outer(&self) -> usize {
        self.outer.len()
    }

    /// Linear solves that stopped before reaching their tolerance.
    pub fn unconverged_solves(&self) -> impl Iterator<Item = &SolverPerformance> {
        self.outer
            .iter()
            .flat_map(|o| o.momentum.iter().chain(&o.pressure))
            .filter(|p| !p.converged)
    }

    /// Largest initial residual of `field` in the first outer iteration;
    /// vector components match by prefix.
    pub fn initial_residual(&self, field: &str) -> Option<f64> {
        let first = self.outer.first()?;
        first
            .momentum
            .iter()
            .chain(&first.pressure)
            .filter(|p| p.field.starts_with(field))
            .map(|p| p.initial_residual)
            .reduce(f64::max)
    }
}
