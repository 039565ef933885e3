//! Transient time loop for the rotating-frame solver.
//!
//! Provides:
//! - The simulation clock with write scheduling and time names ([`RunTime`])
//! - Courant number and adaptive time stepping ([`courant`])
//! - The time loop with observer hooks ([`run_sim`], [`SimObserver`])

pub mod courant;
pub mod error;
pub mod observer;
pub mod runtime;
pub mod sim;

pub use courant::{CourantNumber, courant_number, set_delta_t, set_initial_delta_t};
pub use error::{SimError, SimResult};
pub use observer::{NullObserver, Recorder, SimObserver};
pub use runtime::{RunTime, RunTimeConfig, WriteControl, time_name};
pub use sim::{RunSummary, SimOptions, run_sim};
