//! Pressure correction: flux prediction, pressure solve(s), flux and
//! velocity update.

use rf_core::Vec3;
use rf_fvm::{FvMatrix, RelaxationFactors, SolverDict, SolverPerformance, fvc, fvm};
use rf_mesh::Mesh;
use rf_models::SourceList;

use crate::adjust::adjust_phi;
use crate::continuity::ContinuityErrors;
use crate::control::PimpleLoop;
use crate::error::PimpleResult;
use crate::reference::PressureReference;
use crate::state::FlowState;

/// Inputs of a pressure corrector that do not change within a step.
pub struct PressureStep<'a> {
    pub mesh: &'a Mesh,
    pub solvers: &'a SolverDict,
    pub relaxation: &'a RelaxationFactors,
    pub reference: &'a PressureReference,
    pub delta_t: f64,
}

impl PressureStep<'_> {
    /// One pressure corrector.
    ///
    /// `ueqn` is the momentum system of the current outer iteration;
    /// `momentum_solved` tells whether `Urel` already satisfies it.
    pub fn run(
        &self,
        state: &mut FlowState,
        ueqn: &FvMatrix<Vec3>,
        momentum_solved: bool,
        pimple: &mut PimpleLoop<'_>,
        continuity: &mut ContinuityErrors,
        sources: &mut SourceList,
    ) -> PimpleResult<Vec<SolverPerformance>> {
        let mesh = self.mesh;
        let r_a: Vec<f64> = ueqn.a(mesh).iter().map(|a| 1.0 / a).collect();

        // With a single corrector after a solved predictor, rA H equals
        // Urel + rA grad(p) up to the solver tolerance.
        let hbya_cells: Vec<Vec3> = if momentum_solved && pimple.controls().n_corr == 1 {
            let grad_p = fvc::grad(mesh, &state.p);
            state
                .urel
                .internal()
                .iter()
                .zip(&r_a)
                .zip(&grad_p)
                .map(|((u, r), g)| u + g * *r)
                .collect()
        } else {
            ueqn.h(mesh, &state.urel)
                .iter()
                .zip(&r_a)
                .map(|(h, r)| h * *r)
                .collect()
        };
        let mut hbya = state.urel.clone();
        hbya.assign_internal(&hbya_cells)?;
        hbya.correct_boundary_conditions(mesh);

        let mut phi_hbya = fvc::flux(mesh, &hbya);
        let ddt_corr =
            fvc::ddt_phi_corr(mesh, &r_a, state.urel_old(), state.phi_old(), self.delta_t);
        for (p, c) in phi_hbya.iter_mut().zip(&ddt_corr) {
            *p += c;
        }
        adjust_phi(mesh, &mut phi_hbya, &state.urel, &state.p)?;

        let r_a_f = fvc::interpolate_cells(mesh, &r_a);
        let div_phi = fvc::div(mesh, &phi_hbya);
        let mut performance = Vec::new();
        while pimple.next_non_orthogonal() {
            let mut p_eqn = fvm::laplacian(mesh, &r_a_f, &state.p)?;
            p_eqn.add_explicit_rhs(mesh, &div_phi)?;
            if let Some(cell) = self.reference.cell() {
                p_eqn.set_reference(cell, self.reference.value())?;
            }
            let controls = self.solvers.select(state.p.name(), pimple.final_inner_iter())?;
            let perf = p_eqn.solve(mesh, &mut state.p, controls)?;
            if let Some(first) = perf.first() {
                pimple.record_residual(state.p.name(), first.initial_residual);
            }
            performance.extend(perf);

            if pimple.final_non_orthogonal_iter() {
                let p_flux = p_eqn.flux(mesh, &state.p);
                for ((phi, hf), pf) in state
                    .phi
                    .values_mut()
                    .iter_mut()
                    .zip(&phi_hbya)
                    .zip(&p_flux)
                {
                    *phi = hf - pf;
                }
            }
        }

        continuity.update(mesh, state.phi.values(), self.delta_t);

        if let Some(alpha) = self.relaxation.field(state.p.name(), pimple.final_iter()) {
            state.p.relax(mesh, alpha);
        }

        let grad_p = fvc::grad(mesh, &state.p);
        let urel_cells: Vec<Vec3> = hbya
            .internal()
            .iter()
            .zip(&r_a)
            .zip(&grad_p)
            .map(|((h, r), g)| h - g * *r)
            .collect();
        state.urel.assign_internal(&urel_cells)?;
        state.urel.correct_boundary_conditions(mesh);
        sources.correct(mesh, &mut state.urel)?;

        Ok(performance)
    }
}
