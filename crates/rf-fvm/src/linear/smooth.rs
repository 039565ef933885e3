use crate::controls::SolverControls;

use super::{LduSystem, SolverPerformance, sum_mag};

/// Symmetric Gauss-Seidel, one forward and one backward sweep per iteration.
pub(super) fn run(
    system: &LduSystem<'_>,
    b: &[f64],
    x: &mut [f64],
    norm: f64,
    controls: &SolverControls,
    perf: &mut SolverPerformance,
) {
    let rows = RowView::new(system);
    let mut ax = vec![0.0; system.n()];
    let mut r = vec![0.0; system.n()];

    loop {
        rows.sweep(b, x, false);
        rows.sweep(b, x, true);
        perf.iterations += 1;

        system.amul(x, &mut ax);
        for i in 0..r.len() {
            r[i] = b[i] - ax[i];
        }
        perf.final_residual = sum_mag(&r) / norm;

        let converged = perf.check_convergence(controls);
        if perf.iterations >= controls.max_iter
            || (converged && perf.iterations >= controls.min_iter)
        {
            break;
        }
    }
}

/// Off-diagonal entries grouped by row.
struct RowView<'a> {
    diag: &'a [f64],
    offsets: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
}

impl<'a> RowView<'a> {
    fn new(system: &LduSystem<'a>) -> Self {
        let n = system.n();
        let mut counts = vec![0usize; n];
        for f in 0..system.l.len() {
            counts[system.l[f]] += 1;
            counts[system.u[f]] += 1;
        }
        let mut offsets = vec![0usize; n + 1];
        for i in 0..n {
            offsets[i + 1] = offsets[i] + counts[i];
        }
        let mut fill = offsets.clone();
        let mut cols = vec![0usize; offsets[n]];
        let mut vals = vec![0.0; offsets[n]];
        for f in 0..system.l.len() {
            let (l, u) = (system.l[f], system.u[f]);
            cols[fill[l]] = u;
            vals[fill[l]] = system.upper[f];
            fill[l] += 1;
            cols[fill[u]] = l;
            vals[fill[u]] = system.lower[f];
            fill[u] += 1;
        }
        Self {
            diag: system.diag,
            offsets,
            cols,
            vals,
        }
    }

    fn sweep(&self, b: &[f64], x: &mut [f64], backward: bool) {
        let n = self.diag.len();
        for k in 0..n {
            let i = if backward { n - 1 - k } else { k };
            let mut acc = b[i];
            for j in self.offsets[i]..self.offsets[i + 1] {
                acc -= self.vals[j] * x[self.cols[j]];
            }
            x[i] = acc / self.diag[i];
        }
    }
}
