use crate::controls::SolverControls;

use super::{LduSystem, Precond, SINGULAR, SolverPerformance, dot, sum_mag};

/// Preconditioned conjugate gradient. `r` holds `b - A x` on entry.
pub(super) fn run(
    system: &LduSystem<'_>,
    pre: &Precond,
    x: &mut [f64],
    r: &mut [f64],
    norm: f64,
    controls: &SolverControls,
    perf: &mut SolverPerformance,
) {
    let n = system.n();
    let mut w = vec![0.0; n];
    let mut p = vec![0.0; n];
    let mut wr = 0.0;

    loop {
        let wr_old = wr;
        pre.apply(system, r, &mut w);
        wr = dot(&w, r);

        if perf.iterations == 0 {
            p.copy_from_slice(&w);
        } else {
            let beta = wr / wr_old;
            for i in 0..n {
                p[i] = w[i] + beta * p[i];
            }
        }

        system.amul(&p, &mut w);
        let wp = dot(&w, &p);
        if (wp / norm).abs() < SINGULAR {
            perf.singular = true;
            break;
        }

        let alpha = wr / wp;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * w[i];
        }
        perf.iterations += 1;
        perf.final_residual = sum_mag(r) / norm;

        let converged = perf.check_convergence(controls);
        if perf.iterations >= controls.max_iter
            || (converged && perf.iterations >= controls.min_iter)
        {
            break;
        }
    }
}
