//! rf-pimple: pressure-velocity coupling in a single rotating frame.
//!
//! This crate provides:
//! - Loop control with iteration predicates and residual-based early exit
//!   ([`PimpleControls`], [`PimpleLoop`])
//! - Momentum prediction for the relative velocity ([`momentum`])
//! - The pressure-correction engine with non-orthogonal correction, flux
//!   balancing and pressure reference pinning ([`pressure`])
//! - Continuity error diagnostics ([`ContinuityErrors`])
//! - The time-step driver ([`PimpleSolver`]) and its reports

pub mod adjust;
pub mod continuity;
pub mod control;
pub mod driver;
pub mod error;
pub mod momentum;
pub mod pressure;
pub mod reference;
pub mod report;
pub mod state;

pub use adjust::adjust_phi;
pub use continuity::ContinuityErrors;
pub use control::{PimpleControls, PimpleLoop, ResidualControl, TurbulenceCadence};
pub use driver::{PimpleModels, PimpleSettings, PimpleSolver};
pub use error::{PimpleError, PimpleResult};
pub use momentum::{MomentumOutcome, MomentumStep, assemble_momentum};
pub use pressure::PressureStep;
pub use reference::{PressureReference, ReferenceLocation, ReferenceSpec};
pub use report::{OuterIterationReport, StepReport};
pub use state::FlowState;
