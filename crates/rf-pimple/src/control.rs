//! Outer/inner loop bookkeeping for one time step.
//!
//! [`PimpleControls`] is the static configuration; [`PimpleLoop`] carries the
//! counters of the step in progress and answers the iteration predicates
//! (`first_iter`, `final_iter`, `final_inner_iter`, ...) that select solver
//! tolerances and relaxation factors.

use std::collections::HashMap;

use crate::error::{PimpleError, PimpleResult};

/// When the turbulence closure is updated within a time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurbulenceCadence {
    /// Only on the final outer iteration.
    #[default]
    FinalIterationOnly,
    /// On every `n`-th outer iteration and on the final one.
    Every(usize),
}

/// Convergence target for one field's initial residual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualControl {
    /// Absolute target on the first initial residual of an outer iteration.
    pub tolerance: f64,
    /// Target relative to the initial residual of the first outer iteration;
    /// zero disables the relative check.
    pub rel_tol: f64,
}

/// Loop counts and options of the coupling algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct PimpleControls {
    /// Outer (momentum-pressure) iterations per time step.
    pub n_outer: usize,
    /// Pressure correctors per outer iteration.
    pub n_corr: usize,
    /// Extra pressure solves for the non-orthogonal correction.
    pub n_non_orth: usize,
    /// Solve the momentum system before the pressure correctors.
    pub momentum_predictor: bool,
    pub turbulence: TurbulenceCadence,
    /// Early exit targets keyed by field name (`p`, `Urel`).
    pub residual_control: HashMap<String, ResidualControl>,
}

impl Default for PimpleControls {
    fn default() -> Self {
        Self {
            n_outer: 1,
            n_corr: 1,
            n_non_orth: 0,
            momentum_predictor: true,
            turbulence: TurbulenceCadence::default(),
            residual_control: HashMap::new(),
        }
    }
}

impl PimpleControls {
    pub fn validate(&self) -> PimpleResult<()> {
        if self.n_outer == 0 {
            return Err(PimpleError::configuration("nOuterCorrectors must be at least 1"));
        }
        if self.n_corr == 0 {
            return Err(PimpleError::configuration("nCorrectors must be at least 1"));
        }
        if self.turbulence == TurbulenceCadence::Every(0) {
            return Err(PimpleError::configuration(
                "turbulence correction interval must be at least 1",
            ));
        }
        for (field, rc) in &self.residual_control {
            if !(rc.tolerance.is_finite() && rc.tolerance >= 0.0) {
                return Err(PimpleError::configuration(format!(
                    "residual control tolerance for {field} must be non-negative"
                )));
            }
            if !(rc.rel_tol.is_finite() && (0.0..1.0).contains(&rc.rel_tol)) {
                return Err(PimpleError::configuration(format!(
                    "residual control relTol for {field} must be in [0, 1)"
                )));
            }
        }
        Ok(())
    }
}

/// Counters of one time step.
#[derive(Debug, Clone)]
pub struct PimpleLoop<'a> {
    controls: &'a PimpleControls,
    corr: usize,
    corr_piso: usize,
    corr_non_orth: usize,
    converged: bool,
    exited_converged: bool,
    first_residuals: HashMap<String, f64>,
    residuals: HashMap<String, f64>,
}

impl<'a> PimpleLoop<'a> {
    pub fn new(controls: &'a PimpleControls) -> Self {
        Self {
            controls,
            corr: 0,
            corr_piso: 0,
            corr_non_orth: 0,
            converged: false,
            exited_converged: false,
            first_residuals: HashMap::new(),
            residuals: HashMap::new(),
        }
    }

    pub fn controls(&self) -> &PimpleControls {
        self.controls
    }

    /// Advance to the next outer iteration; false once the step is done.
    ///
    /// When the residual targets are met, one more iteration runs as the
    /// final one before the loop exits.
    pub fn next_outer(&mut self) -> bool {
        self.corr += 1;

        if self.converged {
            tracing::info!("PIMPLE: converged in {} iterations", self.corr - 1);
            self.exited_converged = true;
            return false;
        }

        if self.corr > self.controls.n_outer {
            if !self.controls.residual_control.is_empty() && self.controls.n_outer > 1 {
                tracing::info!(
                    "PIMPLE: not converged within {} iterations",
                    self.controls.n_outer
                );
            }
            return false;
        }

        if self.criteria_satisfied() {
            tracing::info!("PIMPLE: iteration {} reached convergence criteria", self.corr);
            self.converged = true;
        } else if self.controls.n_outer > 1 {
            tracing::info!("PIMPLE: iteration {}", self.corr);
        }
        self.residuals.clear();
        true
    }

    /// Advance to the next pressure corrector; false after the last one.
    pub fn next_corrector(&mut self) -> bool {
        self.corr_piso += 1;
        if self.corr_piso <= self.controls.n_corr {
            true
        } else {
            self.corr_piso = 0;
            false
        }
    }

    /// Advance to the next pressure solve of the non-orthogonal loop;
    /// runs `n_non_orth + 1` times.
    pub fn next_non_orthogonal(&mut self) -> bool {
        self.corr_non_orth += 1;
        if self.corr_non_orth <= self.controls.n_non_orth + 1 {
            true
        } else {
            self.corr_non_orth = 0;
            false
        }
    }

    /// 1-based index of the current outer iteration.
    pub fn corr(&self) -> usize {
        self.corr
    }

    pub fn corr_piso(&self) -> usize {
        self.corr_piso
    }

    pub fn first_iter(&self) -> bool {
        self.corr == 1
    }

    pub fn final_iter(&self) -> bool {
        self.corr >= self.controls.n_outer || self.converged
    }

    pub fn final_corrector(&self) -> bool {
        self.corr_piso >= self.controls.n_corr
    }

    pub fn final_non_orthogonal_iter(&self) -> bool {
        self.corr_non_orth == self.controls.n_non_orth + 1
    }

    /// Last pressure solve of the last corrector of the final outer
    /// iteration; selects the `pFinal` solver controls.
    pub fn final_inner_iter(&self) -> bool {
        self.final_iter() && self.final_corrector() && self.final_non_orthogonal_iter()
    }

    pub fn turb_corr(&self) -> bool {
        match self.controls.turbulence {
            TurbulenceCadence::FinalIterationOnly => self.final_iter(),
            TurbulenceCadence::Every(n) => self.final_iter() || self.corr % n.max(1) == 0,
        }
    }

    /// Record the initial residual of a solve; only the first solve of
    /// each field per outer iteration counts.
    pub fn record_residual(&mut self, field: &str, initial: f64) {
        self.residuals.entry(field.to_string()).or_insert(initial);
        if self.corr == 1 {
            self.first_residuals.entry(field.to_string()).or_insert(initial);
        }
    }

    /// True when every controlled field solved in the last completed outer
    /// iteration met its absolute or relative target, and at least one was.
    pub fn criteria_satisfied(&self) -> bool {
        let mut checked = false;
        let mut achieved = true;
        for (field, rc) in &self.controls.residual_control {
            let Some(&residual) = self.residuals.get(field) else {
                continue;
            };
            checked = true;
            let abs_check = residual < rc.tolerance;
            let rel_check = rc.rel_tol > 0.0
                && self.corr > 2
                && self
                    .first_residuals
                    .get(field)
                    .is_some_and(|&first| residual < rc.rel_tol * first.max(rf_core::VSMALL));
            achieved &= abs_check || rel_check;
        }
        checked && achieved
    }

    /// True when the step ended through the residual targets rather than
    /// the iteration limit.
    pub fn exited_converged(&self) -> bool {
        self.exited_converged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls(n_outer: usize, n_corr: usize, n_non_orth: usize) -> PimpleControls {
        PimpleControls {
            n_outer,
            n_corr,
            n_non_orth,
            ..Default::default()
        }
    }

    #[test]
    fn counts_outer_corrector_and_non_orthogonal_passes() {
        let c = controls(3, 2, 1);
        let mut pimple = PimpleLoop::new(&c);
        let mut outer = 0;
        let mut solves = 0;
        let mut final_inner = 0;
        while pimple.next_outer() {
            outer += 1;
            assert_eq!(pimple.first_iter(), outer == 1);
            assert_eq!(pimple.final_iter(), outer == 3);
            while pimple.next_corrector() {
                while pimple.next_non_orthogonal() {
                    solves += 1;
                    if pimple.final_inner_iter() {
                        final_inner += 1;
                    }
                }
            }
        }
        assert_eq!(outer, 3);
        assert_eq!(solves, 3 * 2 * 2);
        assert_eq!(final_inner, 1);
        assert!(!pimple.exited_converged());
    }

    #[test]
    fn zero_non_orthogonal_correctors_still_solve_once() {
        let c = controls(1, 1, 0);
        let mut pimple = PimpleLoop::new(&c);
        assert!(pimple.next_outer());
        assert!(pimple.next_corrector());
        assert!(pimple.next_non_orthogonal());
        assert!(pimple.final_non_orthogonal_iter());
        assert!(pimple.final_inner_iter());
        assert!(!pimple.next_non_orthogonal());
        assert!(!pimple.next_corrector());
        assert!(!pimple.next_outer());
    }

    #[test]
    fn residual_control_runs_one_final_iteration() {
        let mut c = controls(10, 1, 0);
        c.residual_control.insert(
            "p".into(),
            ResidualControl {
                tolerance: 1e-3,
                rel_tol: 0.0,
            },
        );
        let mut pimple = PimpleLoop::new(&c);
        let residuals = [1e-1, 1e-2, 1e-4, 1e-5, 1e-6];
        let mut finals = Vec::new();
        let mut i = 0;
        while pimple.next_outer() {
            finals.push(pimple.final_iter());
            pimple.record_residual("p", residuals[i]);
            pimple.record_residual("p", 0.5);
            i += 1;
        }
        // met after the third iteration, then one final iteration
        assert_eq!(finals, [false, false, false, true]);
        assert!(pimple.exited_converged());
    }

    #[test]
    fn relative_residual_control_uses_first_iteration() {
        let mut c = controls(10, 1, 0);
        c.residual_control.insert(
            "Urel".into(),
            ResidualControl {
                tolerance: 0.0,
                rel_tol: 0.1,
            },
        );
        let mut pimple = PimpleLoop::new(&c);
        let mut count = 0;
        while pimple.next_outer() {
            count += 1;
            pimple.record_residual("Urel", 1.0 / 4f64.powi(count - 1));
        }
        // 1, 0.25, 0.0625 < 0.1 after three, plus the final iteration
        assert_eq!(count, 4);
        assert!(pimple.exited_converged());
    }

    #[test]
    fn unsolved_fields_do_not_block_residual_control() {
        let mut c = controls(6, 1, 0);
        c.momentum_predictor = false;
        for field in ["Urel", "p"] {
            c.residual_control.insert(
                field.into(),
                ResidualControl {
                    tolerance: 10.0,
                    rel_tol: 0.0,
                },
            );
        }
        let mut pimple = PimpleLoop::new(&c);
        let mut count = 0;
        while pimple.next_outer() {
            count += 1;
            // only the pressure is solved without a momentum predictor
            pimple.record_residual("p", 0.5);
        }
        assert_eq!(count, 2);
        assert!(pimple.exited_converged());
    }

    #[test]
    fn residual_control_needs_a_solved_field() {
        let mut c = controls(3, 1, 0);
        c.residual_control.insert(
            "Urel".into(),
            ResidualControl {
                tolerance: 10.0,
                rel_tol: 0.0,
            },
        );
        let mut pimple = PimpleLoop::new(&c);
        let mut count = 0;
        while pimple.next_outer() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(!pimple.exited_converged());
    }

    #[test]
    fn turbulence_cadence() {
        let mut c = controls(4, 1, 0);
        c.turbulence = TurbulenceCadence::Every(2);
        let mut pimple = PimpleLoop::new(&c);
        let mut corrected = Vec::new();
        while pimple.next_outer() {
            corrected.push(pimple.turb_corr());
        }
        assert_eq!(corrected, [false, true, false, true]);

        c.turbulence = TurbulenceCadence::FinalIterationOnly;
        let mut pimple = PimpleLoop::new(&c);
        let mut corrected = Vec::new();
        while pimple.next_outer() {
            corrected.push(pimple.turb_corr());
        }
        assert_eq!(corrected, [false, false, false, true]);
    }

    #[test]
    fn invalid_counts_are_rejected() {
        assert!(controls(0, 1, 0).validate().is_err());
        assert!(controls(1, 0, 0).validate().is_err());
        let mut c = controls(1, 1, 0);
        c.turbulence = TurbulenceCadence::Every(0);
        assert!(c.validate().is_err());
        assert!(controls(2, 2, 3).validate().is_ok());
    }
}
