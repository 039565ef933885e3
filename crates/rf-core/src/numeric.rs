use crate::{CoreError, CoreResult};
use nalgebra::{Matrix3, Vector3};

/// Floating point type used throughout the solver
pub type Real = f64;

/// Cell/face vector quantity (velocity, area vector, position).
pub type Vec3 = Vector3<Real>;

/// Second-rank tensor (velocity gradient, stress).
pub type Tensor = Matrix3<Real>;

/// Guard against division by zero in ratios of field magnitudes.
pub const SMALL: Real = 1.0e-15;

/// Guard for sums that may legitimately be zero.
pub const VSMALL: Real = 1.0e-300;

/// Stand-in for "unbounded" limits such as the maximum time step.
pub const GREAT: Real = 1.0e15;

#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &str) -> CoreResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite {
            what: what.to_string(),
            value: v,
        })
    }
}

/// Fail on a relaxation factor outside (0, 1].
pub fn ensure_relaxation_factor(alpha: Real, what: &str) -> CoreResult<Real> {
    let alpha = ensure_finite(alpha, what)?;
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(alpha)
    } else {
        Err(CoreError::OutOfRange {
            what: what.to_string(),
            value: alpha,
            range: "(0, 1]",
        })
    }
}

/// Deviatoric part of a tensor.
pub fn dev(t: &Tensor) -> Tensor {
    t - Tensor::identity() * (t.trace() / 3.0)
}

/// Symmetric part of a tensor.
pub fn symm(t: &Tensor) -> Tensor {
    (t + t.transpose()) * 0.5
}
