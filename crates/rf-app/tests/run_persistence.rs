//! Init, run and restart of a small case in a scratch directory.

use std::path::PathBuf;

use rf_app::{
    AppError, RunOptions, RunRequest, StartFrom, field_summary, init_case, list_times,
    load_manifest, load_steps, run_case,
};
use rf_results::RunStatus;

fn scratch_case(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rf_app_{}_{}", std::process::id(), name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let mut case = rf_case::templates::rotating_cavity();
    case.mesh.cells = [8, 8, 1];
    case.control.end_time = 0.02;
    case.control.write_interval = 2.0;
    rf_case::save_yaml(&dir.join("case.yaml"), &case).unwrap();
    dir
}

fn request(dir: &PathBuf, options: RunOptions) -> RunRequest<'_> {
    RunRequest {
        case_dir: dir,
        options,
    }
}

#[test]
fn init_writes_start_time_fields() {
    let dir = scratch_case("init");
    let report = init_case(&dir).unwrap();
    assert_eq!(report.time, "0");
    assert_eq!(report.n_cells, 64);
    for field in ["p", "Urel", "phi", "U"] {
        assert!(dir.join("0").join(format!("{field}.json")).is_file());
    }
    assert_eq!(list_times(&dir).unwrap(), ["0"]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_writes_times_step_log_and_manifest() {
    let dir = scratch_case("run");
    init_case(&dir).unwrap();

    let response = run_case(&request(&dir, RunOptions::default())).unwrap();
    assert_eq!(response.summary.steps, 4);
    assert_eq!(response.summary.written, ["0.01", "0.02"]);
    assert_eq!(list_times(&dir).unwrap(), ["0", "0.01", "0.02"]);

    let steps = load_steps(&dir).unwrap();
    assert_eq!(steps.len(), 4);
    assert!(steps.iter().all(|s| s.courant.is_some()));
    assert!(steps.iter().all(|s| s.initial_residuals.contains_key("p")));

    let manifest = load_manifest(&dir).unwrap();
    assert_eq!(manifest.status, RunStatus::Completed);
    assert_eq!(manifest.steps, 4);
    assert_eq!(manifest.written_times, ["0.01", "0.02"]);
    assert_eq!(Some(manifest), response.manifest);

    let urel = field_summary(&dir, "0.02", "Urel").unwrap();
    assert_eq!(urel.count, 64);
    assert!(urel.max.is_finite() && urel.max > 0.0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn restart_from_latest_time_appends_steps() {
    let dir = scratch_case("restart");
    init_case(&dir).unwrap();
    run_case(&request(&dir, RunOptions::default())).unwrap();

    let options = RunOptions {
        end_time: Some(0.03),
        start_from: StartFrom::LatestTime,
        ..RunOptions::default()
    };
    let response = run_case(&request(&dir, options)).unwrap();
    assert_eq!(response.summary.steps, 2);
    assert_eq!(response.summary.written, ["0.03"]);

    let manifest = response.manifest.unwrap();
    assert_eq!(manifest.start_time, 0.02);
    assert_eq!(load_steps(&dir).unwrap().len(), 6);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn dry_run_writes_nothing() {
    let dir = scratch_case("dry");
    init_case(&dir).unwrap();
    let options = RunOptions {
        write: false,
        ..RunOptions::default()
    };
    let response = run_case(&request(&dir, options)).unwrap();
    assert_eq!(response.summary.steps, 4);
    assert!(response.manifest.is_none());
    assert_eq!(list_times(&dir).unwrap(), ["0"]);
    assert!(load_steps(&dir).unwrap().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_without_initial_fields_fails() {
    let dir = scratch_case("uninit");
    let err = run_case(&request(&dir, RunOptions::default())).unwrap_err();
    assert!(matches!(err, AppError::FieldsMissing { .. }), "{err}");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_case_directory() {
    let dir = std::env::temp_dir().join("rf_app_case_that_does_not_exist");
    let err = run_case(&request(&dir, RunOptions::default())).unwrap_err();
    assert!(matches!(err, AppError::CaseDirMissing { .. }));
}
