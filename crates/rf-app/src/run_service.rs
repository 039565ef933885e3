//! Run execution service.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use rf_core::timing::phases;
use rf_mesh::Mesh;
use rf_pimple::{FlowState, PimpleSolver, StepReport};
use rf_results::{FieldStore, RunManifest, RunStatus, StepRecord, compute_case_hash};
use rf_sim::{
    RunSummary, RunTime, SimError, SimObserver, SimOptions, SimResult, run_sim, time_name,
};

use crate::case_service::load_case;
use crate::compile::compile_case;
use crate::error::AppResult;
use crate::fields::{read_state, write_state};
use crate::progress::{RunProgressEvent, RunStage, TransientProgress};

/// Where the run picks up its initial fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartFrom {
    /// The `startTime` of the case.
    #[default]
    StartTime,
    /// The latest time directory, which also becomes the start time.
    LatestTime,
}

/// Options for running a case.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Overrides the case `endTime`.
    pub end_time: Option<f64>,
    /// Write fields, the step log and the manifest.
    pub write: bool,
    pub solver_version: String,
    pub start_from: StartFrom,
    pub max_steps: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            end_time: None,
            write: true,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
            start_from: StartFrom::StartTime,
            max_steps: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub case_dir: &'a Path,
    pub options: RunOptions,
}

/// Wall-clock breakdown of a run. The phase fields stay zero unless
/// timing is enabled.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub read_time_s: f64,
    pub solve_time_s: f64,
    pub write_time_s: f64,
    pub total_time_s: f64,
    pub momentum_time_s: f64,
    pub pressure_time_s: f64,
    pub linear_solve_time_s: f64,
    pub turbulence_time_s: f64,
    pub linear_solve_count: u64,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub summary: RunSummary,
    /// Present when the run wrote its results.
    pub manifest: Option<RunManifest>,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    transient: Option<TransientProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            transient,
        });
    }
}

/// One step log line from a step report.
pub fn step_record(report: &StepReport) -> StepRecord {
    let mut initial_residuals = BTreeMap::new();
    if let Some(first) = report.outer.first() {
        for perf in first.momentum.iter().chain(&first.pressure) {
            let entry = initial_residuals
                .entry(perf.field.clone())
                .or_insert(perf.initial_residual);
            *entry = entry.max(perf.initial_residual);
        }
    }
    StepRecord {
        time: report.time,
        delta_t: report.delta_t,
        courant: report.courant,
        n_outer: report.n_outer(),
        converged: report.converged,
        initial_residuals,
        unconverged_solves: report.unconverged_solves().count(),
        continuity_sum_local: report.continuity.sum_local,
        continuity_global: report.continuity.global,
        continuity_cumulative: report.continuity.cumulative,
        continuity_warning: report.continuity_warning,
    }
}

fn observer_error(err: impl std::fmt::Display) -> SimError {
    SimError::Observer {
        message: err.to_string(),
    }
}

/// Writes results and forwards progress while the time loop runs.
struct CaseObserver<'a, 'b> {
    store: Option<&'a FieldStore>,
    progress_cb: &'a mut Option<&'b mut dyn FnMut(RunProgressEvent)>,
    started: Instant,
    start_time: f64,
    end_time: f64,
    steps: usize,
    write_time_s: f64,
}

impl SimObserver for CaseObserver<'_, '_> {
    fn on_step(&mut self, runtime: &RunTime, report: &StepReport) -> SimResult<()> {
        self.steps += 1;
        if let Some(store) = self.store {
            store
                .append_step(&step_record(report))
                .map_err(observer_error)?;
        }
        let span = self.end_time - self.start_time;
        let fraction_complete = if span > 0.0 {
            ((runtime.value() - self.start_time) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        emit_progress(
            self.progress_cb,
            RunStage::Running,
            self.started,
            None,
            Some(TransientProgress {
                time: runtime.value(),
                end_time: self.end_time,
                fraction_complete,
                step: self.steps,
                delta_t: report.delta_t,
                courant: report.courant,
                n_outer: report.n_outer(),
                converged: report.converged,
            }),
        );
        Ok(())
    }

    fn on_write(&mut self, runtime: &RunTime, mesh: &Mesh, state: &FlowState) -> SimResult<()> {
        let Some(store) = self.store else {
            return Ok(());
        };
        let time = runtime.time_name();
        emit_progress(
            self.progress_cb,
            RunStage::WritingFields,
            self.started,
            Some(format!("Writing fields at {time}")),
            None,
        );
        let write_started = Instant::now();
        write_state(store, mesh, state, &time).map_err(observer_error)?;
        self.write_time_s += write_started.elapsed().as_secs_f64();
        Ok(())
    }
}

/// Run the case in `request.case_dir`.
pub fn run_case(request: &RunRequest) -> AppResult<RunResponse> {
    run_case_with_progress(request, None)
}

/// Run the case and stream progress events.
pub fn run_case_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();
    let options = &request.options;

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingCase,
        started,
        Some("Loading case".to_string()),
        None,
    );
    let case = load_case(request.case_dir)?;

    emit_progress(
        &mut progress_cb,
        RunStage::CompilingCase,
        started,
        Some("Building mesh and models".to_string()),
        None,
    );
    let compile_started = Instant::now();
    let rt = compile_case(&case)?;
    let store = FieldStore::new(request.case_dir.to_path_buf())?;

    let mut config = rt.time.clone();
    if let Some(end_time) = options.end_time {
        config.end_time = end_time;
    }
    let start_name = match options.start_from {
        StartFrom::StartTime => time_name(config.start_time),
        StartFrom::LatestTime => {
            let (value, name) = store.latest_time()?;
            config.start_time = value;
            name
        }
    };
    let mut runtime = RunTime::new(config)?;
    let models = rt.models()?;
    timing.compile_time_s = compile_started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::ReadingFields,
        started,
        Some(format!("Reading fields at {start_name}")),
        None,
    );
    let read_started = Instant::now();
    let mut state = read_state(&store, &rt.mesh, &start_name, models.frame.as_ref())?;
    let mut solver = PimpleSolver::new(&rt.mesh, &state, rt.settings.clone(), models)?;
    timing.read_time_s = read_started.elapsed().as_secs_f64();

    let mut manifest = if options.write {
        let manifest = RunManifest::started(
            case.name.clone(),
            compute_case_hash(&case, &options.solver_version),
            options.solver_version.clone(),
            runtime.start_time(),
            runtime.end_time(),
        );
        if options.start_from == StartFrom::StartTime {
            store.reset_steps()?;
        }
        store.write_manifest(&manifest)?;
        Some(manifest)
    } else {
        None
    };

    phases::reset_all();
    emit_progress(
        &mut progress_cb,
        RunStage::Running,
        started,
        Some(format!(
            "Running from {} to {}",
            runtime.time_name(),
            time_name(runtime.end_time())
        )),
        None,
    );
    let sim_options = SimOptions {
        max_steps: options.max_steps.unwrap_or(SimOptions::default().max_steps),
    };
    let solve_started = Instant::now();
    let (result, write_time_s) = {
        let mut observer = CaseObserver {
            store: options.write.then_some(&store),
            progress_cb: &mut progress_cb,
            started,
            start_time: runtime.start_time(),
            end_time: runtime.end_time(),
            steps: 0,
            write_time_s: 0.0,
        };
        let result = run_sim(
            &rt.mesh,
            &mut state,
            &mut solver,
            &mut runtime,
            &sim_options,
            &mut observer,
        );
        (result, observer.write_time_s)
    };
    timing.write_time_s = write_time_s;
    timing.solve_time_s = solve_started.elapsed().as_secs_f64() - write_time_s;

    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            tracing::error!(time = runtime.value(), error = %err, "run failed");
            if let Some(manifest) = manifest.as_mut() {
                manifest.steps = runtime.time_index();
                manifest.finish(RunStatus::Failed {
                    message: err.to_string(),
                });
                if let Err(write_err) = store.write_manifest(manifest) {
                    tracing::warn!(error = %write_err, "could not record the failed run");
                }
            }
            return Err(err.into());
        }
    };

    if let Some(manifest) = manifest.as_mut() {
        manifest.steps = summary.steps;
        manifest.written_times = summary.written.clone();
        manifest.end_time = summary.end_time;
        manifest.finish(RunStatus::Completed);
        store.write_manifest(manifest)?;
    }

    timing.momentum_time_s = phases::MOMENTUM.total_seconds();
    timing.pressure_time_s = phases::PRESSURE.total_seconds();
    timing.linear_solve_time_s = phases::LINEAR_SOLVE.total_seconds();
    timing.turbulence_time_s = phases::TURBULENCE.total_seconds();
    timing.linear_solve_count = phases::LINEAR_SOLVE.count();
    timing.total_time_s = started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some(format!(
            "Run completed: {} steps to t = {}",
            summary.steps,
            time_name(summary.end_time)
        )),
        None,
    );

    Ok(RunResponse {
        summary,
        manifest,
        timing,
    })
}
