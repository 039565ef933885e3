//! rf-fvm: finite-volume discretisation for rotaflow.
//!
//! This crate provides:
//! - Cell fields with per-patch boundary conditions ([`VolField`])
//! - Face flux fields ([`SurfaceScalarField`])
//! - LDU-addressed equation systems ([`FvMatrix`]) with relaxation,
//!   reference pinning, row constraints and the `A()`/`H()`/`flux()` views
//! - Implicit operators ([`fvm`]) and explicit operators ([`fvc`])
//! - Iterative linear solvers ([`linear`]) selected through [`SolverDict`]
//! - An ordered term builder ([`TermBuilder`])

pub mod assembly;
pub mod controls;
pub mod error;
pub mod field;
pub mod fvc;
pub mod fvm;
pub mod linear;
pub mod matrix;
pub mod schemes;
pub mod surface;

pub use assembly::TermBuilder;
pub use controls::{Preconditioner, RelaxationFactors, SolverControls, SolverDict, SolverKind};
pub use error::{FvmError, FvmResult};
pub use field::{FieldValue, PatchField, PatchFieldKind, VolField, VolScalarField, VolVectorField};
pub use linear::SolverPerformance;
pub use matrix::FvMatrix;
pub use schemes::ConvectionScheme;
pub use surface::SurfaceScalarField;
