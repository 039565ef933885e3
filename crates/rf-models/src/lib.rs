//! rf-models: closure and frame models for the rotating-frame solver.
//!
//! This crate provides:
//! - Turbulence closures behind [`TurbulenceModel`] (`Laminar`, `Smagorinsky`)
//! - Reference-frame kinematics behind [`FrameModel`] (`RotatingFrame`,
//!   `StationaryFrame`)
//! - Volumetric momentum sources behind [`MomentumSource`], collected in a
//!   [`SourceList`]
//!
//! Models are selected when a case is set up and then used through their
//! traits only.

pub mod error;
pub mod frame;
pub mod selection;
pub mod sources;
pub mod turbulence;

pub use error::{ModelError, ModelResult};
pub use frame::{FrameModel, RotatingFrame, StationaryFrame, srf_velocity_values};
pub use selection::CellSelection;
pub use sources::{
    ExplicitSource, FixedVelocity, MeanVelocityForce, MomentumSource, SourceList, VelocityLimit,
    VolumeMode,
};
pub use turbulence::{Laminar, Smagorinsky, TurbulenceModel};
