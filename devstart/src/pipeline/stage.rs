//! Stages: labelled groups of tasks sharing an execution mode.

/// How the tasks of one stage are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run together; the first error aborts the stage.
    Parallel,
    /// Run in order; a task finishing the pipeline skips the rest.
    Sequential,
}

/// Stages run in plan order. The label names the stage in logs and metrics.
#[derive(Debug, Clone)]
pub struct Stage<T> {
    pub label: &'static str,
    pub tasks: Vec<T>,
    pub execution: ExecutionMode,
}

impl<T> Stage<T> {
    pub fn parallel(label: &'static str, tasks: Vec<T>) -> Self {
        Self {
            label,
            tasks,
            execution: ExecutionMode::Parallel,
        }
    }

    pub fn sequential(label: &'static str, tasks: Vec<T>) -> Self {
        Self {
            label,
            tasks,
            execution: ExecutionMode::Sequential,
        }
    }
}
