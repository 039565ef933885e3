//! Ordered accumulation of terms into one system.
//!
//! Terms are summed in the order they are added. The order is part of the
//! contract: floating-point accumulation differs between orders, and the
//! momentum assembly relies on a fixed one.

use rf_mesh::Mesh;

use crate::error::{FvmError, FvmResult};
use crate::field::FieldValue;
use crate::matrix::FvMatrix;

/// Builder that sums named implicit terms and explicit sources.
#[derive(Debug, Clone)]
pub struct TermBuilder<T> {
    matrix: FvMatrix<T>,
    terms: Vec<String>,
}

impl<T: FieldValue> TermBuilder<T> {
    pub fn new(mesh: &Mesh, psi_name: impl Into<String>) -> Self {
        Self {
            matrix: FvMatrix::new(mesh, psi_name),
            terms: Vec::new(),
        }
    }

    /// Add an implicit term.
    pub fn add(mut self, name: impl Into<String>, term: FvMatrix<T>) -> FvmResult<Self> {
        let name: String = name.into();
        if term.psi_name() != self.matrix.psi_name() {
            return Err(FvmError::InvalidArg {
                what: format!(
                    "term for {} added to system for {}",
                    term.psi_name(),
                    self.matrix.psi_name()
                ),
            });
        }
        if term.diag().len() != self.matrix.diag().len() {
            return Err(FvmError::SizeMismatch {
                what: format!("term {name}"),
                expected: self.matrix.diag().len(),
                got: term.diag().len(),
            });
        }
        self.matrix += &term;
        self.terms.push(name);
        Ok(self)
    }

    /// Add an explicit per-volume term on the left-hand side.
    pub fn add_explicit(mut self, name: impl Into<String>, mesh: &Mesh, su: &[T]) -> FvmResult<Self> {
        self.matrix.add_explicit_lhs(mesh, su)?;
        self.terms.push(name.into());
        Ok(self)
    }

    /// Names of the terms in accumulation order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn build(self) -> FvMatrix<T> {
        self.matrix
    }
}
