//! One time step of the coupled relative-velocity / pressure solution.

use rf_core::timing::{Timer, phases};
use rf_fvm::{ConvectionScheme, RelaxationFactors, SolverDict, SolverPerformance};
use rf_mesh::Mesh;
use rf_models::{FrameModel, SourceList, TurbulenceModel};

use crate::continuity::ContinuityErrors;
use crate::control::{PimpleControls, PimpleLoop};
use crate::error::{PimpleError, PimpleResult};
use crate::momentum::MomentumStep;
use crate::pressure::PressureStep;
use crate::reference::{PressureReference, ReferenceSpec};
use crate::report::{OuterIterationReport, StepReport};
use crate::state::FlowState;

/// Numerical settings of the coupling.
#[derive(Debug, Clone, PartialEq)]
pub struct PimpleSettings {
    pub controls: PimpleControls,
    /// Linear solver controls; `p` and `Urel` are required.
    pub solvers: SolverDict,
    pub relaxation: RelaxationFactors,
    /// Interpolation of `div(phi, Urel)`.
    pub convection: ConvectionScheme,
    pub reference: ReferenceSpec,
    /// Global continuity error above which a step is flagged.
    pub continuity_warning: f64,
}

impl Default for PimpleSettings {
    fn default() -> Self {
        Self {
            controls: PimpleControls::default(),
            solvers: SolverDict::new(),
            relaxation: RelaxationFactors::default(),
            convection: ConvectionScheme::Linear,
            reference: ReferenceSpec::default(),
            continuity_warning: 1e-6,
        }
    }
}

impl PimpleSettings {
    pub fn validate(&self) -> PimpleResult<()> {
        self.controls.validate()?;
        self.solvers.validate()?;
        self.relaxation.validate()?;
        for field in ["p", "Urel"] {
            if !self.solvers.contains(field) {
                return Err(PimpleError::configuration(format!(
                    "no linear solver controls for {field}"
                )));
            }
        }
        if !(self.continuity_warning.is_finite() && self.continuity_warning > 0.0) {
            return Err(PimpleError::configuration(
                "continuity warning threshold must be positive",
            ));
        }
        Ok(())
    }
}

/// Physical models taking part in the momentum equation.
pub struct PimpleModels {
    pub turbulence: Box<dyn TurbulenceModel>,
    pub frame: Box<dyn FrameModel>,
    pub sources: SourceList,
}

impl std::fmt::Debug for PimpleModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PimpleModels")
            .field("turbulence", &self.turbulence.name())
            .field("frame", &self.frame.name())
            .field("sources", &self.sources)
            .finish()
    }
}

/// Time-step driver: outer iterations of momentum prediction, pressure
/// correction, absolute velocity update and turbulence correction.
#[derive(Debug)]
pub struct PimpleSolver {
    settings: PimpleSettings,
    models: PimpleModels,
    reference: PressureReference,
    continuity: ContinuityErrors,
}

impl PimpleSolver {
    /// Validate the settings against the mesh and the initial state.
    pub fn new(
        mesh: &Mesh,
        state: &FlowState,
        settings: PimpleSettings,
        models: PimpleModels,
    ) -> PimpleResult<Self> {
        settings.validate()?;
        if state.p.name() != "p" || state.urel.name() != "Urel" {
            return Err(PimpleError::configuration(format!(
                "expected fields p and Urel, got {} and {}",
                state.p.name(),
                state.urel.name()
            )));
        }
        let reference = PressureReference::resolve(mesh, &state.p, &settings.reference)?;
        tracing::info!(
            turbulence = models.turbulence.name(),
            frame = models.frame.name(),
            sources = ?models.sources.names(),
            n_outer = settings.controls.n_outer,
            n_corr = settings.controls.n_corr,
            n_non_orth = settings.controls.n_non_orth,
            "PIMPLE solver ready"
        );
        Ok(Self {
            settings,
            models,
            reference,
            continuity: ContinuityErrors::new(),
        })
    }

    pub fn settings(&self) -> &PimpleSettings {
        &self.settings
    }

    pub fn models(&self) -> &PimpleModels {
        &self.models
    }

    pub fn reference(&self) -> &PressureReference {
        &self.reference
    }

    pub fn continuity(&self) -> &ContinuityErrors {
        &self.continuity
    }

    /// Advance `state` from `time - delta_t` to `time`.
    pub fn step(
        &mut self,
        mesh: &Mesh,
        state: &mut FlowState,
        time: f64,
        delta_t: f64,
    ) -> PimpleResult<StepReport> {
        if !(delta_t.is_finite() && delta_t > 0.0) {
            return Err(PimpleError::configuration(format!(
                "time step must be positive, got {delta_t}"
            )));
        }
        state.store_old_time();

        let Self {
            settings,
            models,
            reference,
            continuity,
        } = self;
        let pressure = PressureStep {
            mesh,
            solvers: &settings.solvers,
            relaxation: &settings.relaxation,
            reference,
            delta_t,
        };

        let mut pimple = PimpleLoop::new(&settings.controls);
        let mut outer = Vec::new();
        while pimple.next_outer() {
            state.p.store_prev_iter();
            state.urel.store_prev_iter();
            let final_iter = pimple.final_iter();

            let timer = Timer::start();
            let momentum = MomentumStep {
                mesh,
                turbulence: models.turbulence.as_ref(),
                frame: models.frame.as_ref(),
                scheme: settings.convection,
                solvers: &settings.solvers,
                relaxation: &settings.relaxation,
                delta_t,
            };
            let m = momentum.run(
                state,
                &mut models.sources,
                final_iter,
                settings.controls.momentum_predictor,
            )?;
            timer.stop_into(&phases::MOMENTUM);
            if let Some(initial) = m.performance.iter().map(|p| p.initial_residual).reduce(f64::max)
            {
                pimple.record_residual(state.urel.name(), initial);
            }

            let timer = Timer::start();
            let mut p_perf = Vec::new();
            while pimple.next_corrector() {
                p_perf.extend(pressure.run(
                    state,
                    &m.eqn,
                    m.solved,
                    &mut pimple,
                    continuity,
                    &mut models.sources,
                )?);
            }
            timer.stop_into(&phases::PRESSURE);

            state.update_absolute_velocity(mesh, models.frame.as_ref())?;

            let turbulence_corrected = pimple.turb_corr();
            if turbulence_corrected {
                let timer = Timer::start();
                models.turbulence.correct(mesh, &state.urel)?;
                timer.stop_into(&phases::TURBULENCE);
            }

            outer.push(OuterIterationReport {
                iteration: pimple.corr(),
                final_iteration: final_iter,
                momentum: m.performance,
                pressure: p_perf,
                urel_change: change_norm(state.urel.internal(), state.urel.prev_iter(), |d| {
                    d.norm_squared()
                }),
                p_change: change_norm(state.p.internal(), state.p.prev_iter(), |d| d * d),
                turbulence_corrected,
            });
        }

        let converged = if settings.controls.residual_control.is_empty() {
            outer.last().is_some_and(|o| {
                o.momentum
                    .iter()
                    .chain(&o.pressure)
                    .all(|p: &SolverPerformance| p.converged)
            })
        } else {
            pimple.exited_converged()
        };

        let continuity_warning = continuity.global.abs() > settings.continuity_warning;
        if continuity_warning {
            tracing::warn!(
                time,
                global = continuity.global,
                threshold = settings.continuity_warning,
                "continuity error above threshold"
            );
        }

        Ok(StepReport {
            time,
            delta_t,
            courant: None,
            outer,
            converged,
            continuity: *continuity,
            continuity_warning,
        })
    }
}

fn change_norm<T: Copy + std::ops::Sub<Output = T>>(
    current: &[T],
    previous: Option<&[T]>,
    square: impl Fn(T) -> f64,
) -> f64 {
    previous.map_or(0.0, |prev| {
        current
            .iter()
            .zip(prev)
            .map(|(c, p)| square(*c - *p))
            .sum::<f64>()
            .sqrt()
    })
}
