//! Hooks called by the time loop.

use rf_mesh::Mesh;
use rf_pimple::{FlowState, StepReport};

use crate::error::SimResult;
use crate::runtime::RunTime;
use crate::sim::RunSummary;

/// Receives step reports and write-time states. Errors abort the run.
pub trait SimObserver {
    /// Called after every completed time step.
    fn on_step(&mut self, _runtime: &RunTime, _report: &StepReport) -> SimResult<()> {
        Ok(())
    }

    /// Called after a step that lands on a write time.
    fn on_write(&mut self, _runtime: &RunTime, _mesh: &Mesh, _state: &FlowState) -> SimResult<()> {
        Ok(())
    }

    /// Called once when the loop ends normally.
    fn on_finish(&mut self, _summary: &RunSummary) -> SimResult<()> {
        Ok(())
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SimObserver for NullObserver {}

/// Keeps every step report and the names of written times.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub reports: Vec<StepReport>,
    pub written: Vec<String>,
}

impl SimObserver for Recorder {
    fn on_step(&mut self, _runtime: &RunTime, report: &StepReport) -> SimResult<()> {
        self.reports.push(report.clone());
        Ok(())
    }

    fn on_write(&mut self, runtime: &RunTime, _mesh: &Mesh, _state: &FlowState) -> SimResult<()> {
        self.written.push(runtime.time_name());
        Ok(())
    }
}
