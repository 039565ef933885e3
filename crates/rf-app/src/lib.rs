//! Shared application service layer for rotaflow.
//!
//! Turns a case directory into a running solver: loads and validates the
//! case definition, compiles mesh, models and settings, reads and writes
//! time directories, and drives the time loop with progress reporting.

pub mod case_service;
pub mod compile;
pub mod error;
pub mod fields;
pub mod progress;
pub mod query;
pub mod run_service;

pub use case_service::{CaseSummary, create_from_template, load_case, validate_case_dir};
pub use compile::{CaseRuntime, compile_case};
pub use error::{AppError, AppResult};
pub use fields::{FIELD_IO, FieldIo, InitReport, init_case, read_state, write_state};
pub use progress::{RunProgressEvent, RunStage, TransientProgress};
pub use query::{field_summary, list_times, load_manifest, load_steps, residual_series, troubled_steps};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, RunTimingSummary, StartFrom, run_case,
    run_case_with_progress, step_record,
};
