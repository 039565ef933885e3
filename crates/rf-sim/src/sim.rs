//! Time loop: Courant control, PIMPLE steps and observer hooks.

use std::time::Instant;

use rf_mesh::Mesh;
use rf_pimple::{ContinuityErrors, FlowState, PimpleSolver};

use crate::courant::{CourantNumber, courant_number, set_delta_t, set_initial_delta_t};
use crate::error::{SimError, SimResult};
use crate::observer::SimObserver;
use crate::runtime::RunTime;

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
        }
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub end_time: f64,
    /// Wall time spent inside PIMPLE steps (seconds)
    pub execution_time_s: f64,
    /// Total wall time including observers (seconds)
    pub clock_time_s: f64,
    /// Steps whose report was not converged
    pub unconverged_steps: usize,
    /// Steps that breached the continuity warning threshold
    pub continuity_warnings: usize,
    pub last_courant: CourantNumber,
    pub continuity: ContinuityErrors,
    /// Written time names, in order
    pub written: Vec<String>,
}

/// Advance `state` until `runtime` reaches its end time.
pub fn run_sim(
    mesh: &Mesh,
    state: &mut FlowState,
    solver: &mut PimpleSolver,
    runtime: &mut RunTime,
    opts: &SimOptions,
    observer: &mut dyn SimObserver,
) -> SimResult<RunSummary> {
    if opts.max_steps == 0 {
        return Err(SimError::invalid("max_steps must be positive"));
    }
    let clock = Instant::now();
    let mut execution_time_s = 0.0;

    let mut co = courant_number(mesh, state.phi.values(), runtime.delta_t());
    set_initial_delta_t(runtime, co)?;

    let mut summary = RunSummary {
        steps: 0,
        end_time: runtime.value(),
        execution_time_s: 0.0,
        clock_time_s: 0.0,
        unconverged_steps: 0,
        continuity_warnings: 0,
        last_courant: co,
        continuity: *solver.continuity(),
        written: Vec::new(),
    };

    while runtime.run() {
        if summary.steps >= opts.max_steps {
            tracing::warn!(
                steps = summary.steps,
                time = runtime.value(),
                "stopping at max_steps before the end time"
            );
            break;
        }
        co = courant_number(mesh, state.phi.values(), runtime.delta_t());
        set_delta_t(runtime, co)?;
        runtime.increment();
        tracing::info!("Time = {}", runtime.time_name());

        let started = Instant::now();
        let mut report = solver.step(mesh, state, runtime.value(), runtime.delta_t())?;
        execution_time_s += started.elapsed().as_secs_f64();
        report.courant = Some(co.max);

        summary.steps += 1;
        if !report.converged {
            summary.unconverged_steps += 1;
            tracing::warn!(time = report.time, n_outer = report.n_outer(), "step not converged");
        }
        if report.continuity_warning {
            summary.continuity_warnings += 1;
        }
        summary.continuity = report.continuity;
        summary.last_courant = co;
        observer.on_step(runtime, &report)?;

        if runtime.write_time() {
            observer.on_write(runtime, mesh, state)?;
            summary.written.push(runtime.time_name());
        }

        tracing::info!(
            "ExecutionTime = {:.2} s  ClockTime = {:.2} s",
            execution_time_s,
            clock.elapsed().as_secs_f64()
        );
    }

    summary.end_time = runtime.value();
    summary.execution_time_s = execution_time_s;
    summary.clock_time_s = clock.elapsed().as_secs_f64();
    observer.on_finish(&summary)?;
    tracing::info!(steps = summary.steps, end_time = summary.end_time, "End");
    Ok(summary)
}
