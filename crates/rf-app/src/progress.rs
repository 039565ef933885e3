#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStage {
    LoadingCase,
    CompilingCase,
    ReadingFields,
    Running,
    WritingFields,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::LoadingCase => "loading",
            RunStage::CompilingCase => "compiling",
            RunStage::ReadingFields => "reading",
            RunStage::Running => "running",
            RunStage::WritingFields => "writing",
            RunStage::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransientProgress {
    pub time: f64,
    pub end_time: f64,
    pub fraction_complete: f64,
    pub step: usize,
    pub delta_t: f64,
    pub courant: Option<f64>,
    pub n_outer: usize,
    pub converged: bool,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub transient: Option<TransientProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            transient: None,
        }
    }
}
