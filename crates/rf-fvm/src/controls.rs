//! Linear-solver and relaxation controls keyed by field name.

use std::collections::HashMap;

use rf_core::ensure_relaxation_factor;

use crate::error::{FvmError, FvmResult};

/// Suffix selecting the final-iteration entry of a dictionary.
pub const FINAL_SUFFIX: &str = "Final";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Preconditioned conjugate gradient, symmetric systems.
    Pcg,
    /// Preconditioned stabilised bi-conjugate gradient.
    PBiCgStab,
    /// Symmetric Gauss-Seidel sweeps.
    SmoothSolver,
}

impl SolverKind {
    pub fn label(self) -> &'static str {
        match self {
            SolverKind::Pcg => "PCG",
            SolverKind::PBiCgStab => "PBiCGStab",
            SolverKind::SmoothSolver => "smoothSolver",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preconditioner {
    None,
    Diagonal,
    /// Diagonal incomplete Cholesky.
    Dic,
    /// Diagonal incomplete LU.
    Dilu,
}

impl Preconditioner {
    pub fn label(self) -> &'static str {
        match self {
            Preconditioner::None => "",
            Preconditioner::Diagonal => "diagonal",
            Preconditioner::Dic => "DIC",
            Preconditioner::Dilu => "DILU",
        }
    }
}

/// Controls for one linear solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverControls {
    pub solver: SolverKind,
    pub preconditioner: Preconditioner,
    /// Absolute tolerance on the normalised residual.
    pub tolerance: f64,
    /// Tolerance relative to the initial residual, 0 disables it.
    pub rel_tol: f64,
    pub max_iter: usize,
    pub min_iter: usize,
}

impl Default for SolverControls {
    fn default() -> Self {
        Self {
            solver: SolverKind::PBiCgStab,
            preconditioner: Preconditioner::Dilu,
            tolerance: 1e-6,
            rel_tol: 0.0,
            max_iter: 1000,
            min_iter: 0,
        }
    }
}

impl SolverControls {
    pub fn pcg(tolerance: f64, rel_tol: f64) -> Self {
        Self {
            solver: SolverKind::Pcg,
            preconditioner: Preconditioner::Dic,
            tolerance,
            rel_tol,
            ..Self::default()
        }
    }

    pub fn pbicgstab(tolerance: f64, rel_tol: f64) -> Self {
        Self {
            tolerance,
            rel_tol,
            ..Self::default()
        }
    }

    pub fn validate(&self, name: &str) -> FvmResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(FvmError::InvalidArg {
                what: format!("{name}: tolerance must be non-negative"),
            });
        }
        if !(self.rel_tol.is_finite() && (0.0..1.0).contains(&self.rel_tol)) {
            return Err(FvmError::InvalidArg {
                what: format!("{name}: relTol must be in [0, 1)"),
            });
        }
        if self.max_iter == 0 {
            return Err(FvmError::InvalidArg {
                what: format!("{name}: maxIter must be positive"),
            });
        }
        if self.solver == SolverKind::Pcg && self.preconditioner == Preconditioner::Dilu {
            return Err(FvmError::InvalidArg {
                what: format!("{name}: PCG needs a symmetric preconditioner"),
            });
        }
        Ok(())
    }
}

/// Solver controls per field name; `<name>Final` entries are used on the
/// final inner iteration and fall back to the base entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverDict {
    entries: HashMap<String, SolverControls>,
}

impl SolverDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, controls: SolverControls) -> &mut Self {
        self.entries.insert(name.into(), controls);
        self
    }

    pub fn with(mut self, name: impl Into<String>, controls: SolverControls) -> Self {
        self.insert(name, controls);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn select(&self, name: &str, final_iter: bool) -> FvmResult<&SolverControls> {
        if final_iter
            && let Some(c) = self.entries.get(&format!("{name}{FINAL_SUFFIX}"))
        {
            return Ok(c);
        }
        self.entries
            .get(name)
            .ok_or_else(|| FvmError::MissingSolverControls {
                name: name.to_string(),
            })
    }

    pub fn validate(&self) -> FvmResult<()> {
        for (name, c) in &self.entries {
            c.validate(name)?;
        }
        Ok(())
    }
}

/// Under-relaxation factors for fields (explicit) and equations (implicit).
///
/// On the final outer iteration only `<name>Final` entries apply; a missing
/// entry means no relaxation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelaxationFactors {
    pub fields: HashMap<String, f64>,
    pub equations: HashMap<String, f64>,
}

impl RelaxationFactors {
    pub fn field(&self, name: &str, final_iter: bool) -> Option<f64> {
        lookup(&self.fields, name, final_iter)
    }

    pub fn equation(&self, name: &str, final_iter: bool) -> Option<f64> {
        lookup(&self.equations, name, final_iter)
    }

    pub fn validate(&self) -> FvmResult<()> {
        for (name, &alpha) in self.fields.iter().chain(&self.equations) {
            ensure_relaxation_factor(alpha, &format!("relaxation factor {name}"))?;
        }
        Ok(())
    }
}

fn lookup(map: &HashMap<String, f64>, name: &str, final_iter: bool) -> Option<f64> {
    if final_iter {
        map.get(&format!("{name}{FINAL_SUFFIX}")).copied()
    } else {
        map.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_entry_falls_back_to_base() {
        let dict = SolverDict::new()
            .with("p", SolverControls::pcg(1e-6, 0.05))
            .with("pFinal", SolverControls::pcg(1e-6, 0.0))
            .with("Urel", SolverControls::pbicgstab(1e-5, 0.0));

        assert_eq!(dict.select("p", false).unwrap().rel_tol, 0.05);
        assert_eq!(dict.select("p", true).unwrap().rel_tol, 0.0);
        assert_eq!(dict.select("Urel", true).unwrap().tolerance, 1e-5);
        assert!(matches!(
            dict.select("k", false),
            Err(FvmError::MissingSolverControls { .. })
        ));
        assert!(dict.validate().is_ok());
    }

    #[test]
    fn invalid_controls_are_rejected() {
        let mut c = SolverControls::pcg(1e-6, 0.0);
        c.preconditioner = Preconditioner::Dilu;
        assert!(c.validate("p").is_err());
        let c = SolverControls::pbicgstab(-1.0, 0.0);
        assert!(c.validate("U").is_err());
    }

    #[test]
    fn relaxation_final_lookup_does_not_fall_back() {
        let mut r = RelaxationFactors::default();
        r.fields.insert("p".into(), 0.3);
        r.equations.insert("Urel".into(), 0.7);
        r.equations.insert("UrelFinal".into(), 1.0);
        assert_eq!(r.field("p", false), Some(0.3));
        assert_eq!(r.field("p", true), None);
        assert_eq!(r.equation("Urel", true), Some(1.0));
        assert!(r.validate().is_ok());
        r.fields.insert("q".into(), 1.5);
        assert!(r.validate().is_err());
    }
}
