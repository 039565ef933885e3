use crate::controls::SolverControls;

use super::{LduSystem, Precond, SINGULAR, SolverPerformance, dot, sum_mag};

/// Preconditioned BiCGStab. `r` holds `b - A x` on entry.
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
    let r0 = r.to_vec();
    let mut p = vec![0.0; n];
    let mut y = vec![0.0; n];
    let mut ay = vec![0.0; n];
    let mut s = vec![0.0; n];
    let mut z = vec![0.0; n];
    let mut t = vec![0.0; n];

    let mut r0r: f64 = 0.0;
    let mut alpha: f64 = 0.0;
    let mut omega: f64 = 0.0;

    loop {
        let r0r_old = r0r;
        r0r = dot(&r0, r);

        if perf.iterations == 0 {
            p.copy_from_slice(r);
        } else {
            if r0r.abs() < SINGULAR || omega.abs() < SINGULAR {
                perf.singular = true;
                break;
            }
            let beta = (r0r / r0r_old) * (alpha / omega);
            for i in 0..n {
                p[i] = r[i] + beta * (p[i] - omega * ay[i]);
            }
        }

        pre.apply(system, &p, &mut y);
        system.amul(&y, &mut ay);
        let r0ay = dot(&r0, &ay);
        if r0ay.abs() < SINGULAR {
            perf.singular = true;
            break;
        }
        alpha = r0r / r0ay;

        for i in 0..n {
            s[i] = r[i] - alpha * ay[i];
        }
        perf.final_residual = sum_mag(&s) / norm;
        if perf.check_convergence(controls) && perf.iterations + 1 >= controls.min_iter {
            for i in 0..n {
                x[i] += alpha * y[i];
            }
            perf.iterations += 1;
            break;
        }

        pre.apply(system, &s, &mut z);
        system.amul(&z, &mut t);
        let tt = dot(&t, &t);
        omega = if tt > SINGULAR { dot(&t, &s) / tt } else { 0.0 };

        for i in 0..n {
            x[i] += alpha * y[i] + omega * z[i];
            r[i] = s[i] - omega * t[i];
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
