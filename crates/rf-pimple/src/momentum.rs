//! Relative-velocity momentum predictor.

use rf_core::Vec3;
use rf_fvm::{
    ConvectionScheme, FvMatrix, RelaxationFactors, SolverDict, SolverPerformance, TermBuilder,
    fvc, fvm,
};
use rf_mesh::Mesh;
use rf_models::{FrameModel, SourceList, TurbulenceModel};

use crate::error::PimpleResult;
use crate::state::FlowState;

/// Assembled momentum system and the solves performed on it.
#[derive(Debug, Clone)]
pub struct MomentumOutcome {
    /// Relaxed, constrained system including the explicit sources but not
    /// the pressure gradient; its `A()` and `H()` feed the pressure
    /// correctors.
    pub eqn: FvMatrix<Vec3>,
    pub performance: Vec<SolverPerformance>,
    /// Whether the predictor solve ran.
    pub solved: bool,
}

/// Left-hand side `divDevReff(Urel) + div(phi, Urel) + ddt(Urel) + Su`,
/// summed in that order.
pub fn assemble_momentum(
    mesh: &Mesh,
    state: &FlowState,
    turbulence: &dyn TurbulenceModel,
    frame: &dyn FrameModel,
    scheme: ConvectionScheme,
    delta_t: f64,
) -> PimpleResult<FvMatrix<Vec3>> {
    let urel = &state.urel;
    let builder = TermBuilder::new(mesh, urel.name())
        .add("divDevReff(Urel)", turbulence.div_dev_reff(mesh, urel)?)?
        .add("div(phi,Urel)", fvm::div(mesh, &state.phi, urel, scheme)?)?
        .add(
            "ddt(Urel)",
            fvm::ddt(mesh, urel, state.urel_old().internal(), delta_t)?,
        )?
        .add_explicit("SRF::Su", mesh, &frame.su(mesh, urel))?;
    tracing::trace!(terms = ?builder.terms(), "momentum terms");
    Ok(builder.build())
}

/// Inputs of one momentum predictor that do not change within a step.
pub struct MomentumStep<'a> {
    pub mesh: &'a Mesh,
    pub turbulence: &'a dyn TurbulenceModel,
    pub frame: &'a dyn FrameModel,
    pub scheme: ConvectionScheme,
    pub solvers: &'a SolverDict,
    pub relaxation: &'a RelaxationFactors,
    pub delta_t: f64,
}

impl MomentumStep<'_> {
    /// Assemble, relax, add the sources, let them constrain the system and,
    /// when `predict` is set, solve `eqn == -grad(p)` for `Urel`.
    pub fn run(
        &self,
        state: &mut FlowState,
        sources: &mut SourceList,
        final_iter: bool,
        predict: bool,
    ) -> PimpleResult<MomentumOutcome> {
        let mesh = self.mesh;
        let mut eqn = assemble_momentum(
            mesh,
            state,
            self.turbulence,
            self.frame,
            self.scheme,
            self.delta_t,
        )?;

        let name = state.urel.name().to_string();
        if let Some(alpha) = self.relaxation.equation(&name, final_iter) {
            eqn.relax(mesh, &state.urel, alpha)?;
        }
        if !sources.is_empty() {
            eqn.add_explicit_rhs(mesh, &sources.sources(mesh))?;
        }
        sources.constrain(mesh, &mut eqn, &mut state.urel)?;

        let mut performance = Vec::new();
        if predict {
            let neg_grad_p: Vec<Vec3> = fvc::grad(mesh, &state.p).iter().map(|g| -g).collect();
            let mut full = eqn.clone();
            full.add_explicit_rhs(mesh, &neg_grad_p)?;
            let controls = self.solvers.select(&name, final_iter)?;
            performance = full.solve(mesh, &mut state.urel, controls)?;
        }

        Ok(MomentumOutcome {
            eqn,
            performance,
            solved: predict,
        })
    }
}
