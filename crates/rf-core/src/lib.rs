//! rf-core: shared foundation for rotaflow.
//!
//! Contains:
//! - numeric (Real, Vec3/Tensor aliases, tolerances, float helpers)
//! - units (uom SI types + constructors used at model boundaries)
//! - ids (compact patch identifiers)
//! - timing (opt-in phase timers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
