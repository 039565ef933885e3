use crate::controls::Preconditioner;

use super::LduSystem;

/// Factorised preconditioner, applied as `w = M^-1 r`.
#[derive(Debug, Clone)]
pub struct Precond {
    kind: Preconditioner,
    r_d: Vec<f64>,
}

impl Precond {
    pub fn identity(n: usize) -> Self {
        Self {
            kind: Preconditioner::None,
            r_d: vec![1.0; n],
        }
    }

    pub fn new(system: &LduSystem<'_>, kind: Preconditioner) -> Self {
        let mut r_d = system.diag.to_vec();
        match kind {
            Preconditioner::None => return Self::identity(system.n()),
            Preconditioner::Diagonal => {}
            Preconditioner::Dic => {
                for f in 0..system.l.len() {
                    let (l, u) = (system.l[f], system.u[f]);
                    r_d[u] -= system.upper[f] * system.upper[f] / r_d[l];
                }
            }
            Preconditioner::Dilu => {
                for f in 0..system.l.len() {
                    let (l, u) = (system.l[f], system.u[f]);
                    r_d[u] -= system.upper[f] * system.lower[f] / r_d[l];
                }
            }
        }
        for d in &mut r_d {
            *d = 1.0 / *d;
        }
        Self { kind, r_d }
    }

    pub fn apply(&self, system: &LduSystem<'_>, r: &[f64], w: &mut [f64]) {
        match self.kind {
            Preconditioner::None => w.copy_from_slice(r),
            Preconditioner::Diagonal => {
                for i in 0..w.len() {
                    w[i] = self.r_d[i] * r[i];
                }
            }
            Preconditioner::Dic | Preconditioner::Dilu => {
                let lower = if self.kind == Preconditioner::Dic {
                    system.upper
                } else {
                    system.lower
                };
                for i in 0..w.len() {
                    w[i] = self.r_d[i] * r[i];
                }
                for f in 0..system.l.len() {
                    let (l, u) = (system.l[f], system.u[f]);
                    w[u] -= self.r_d[u] * lower[f] * w[l];
                }
                for f in (0..system.l.len()).rev() {
                    let (l, u) = (system.l[f], system.u[f]);
                    w[l] -= self.r_d[l] * system.upper[f] * w[u];
                }
            }
        }
    }
}
