use crate::pipeline::ExecutionMode;

#[derive(Debug, Clone)]
pub struct TaskMetrics {
    pub name: String,
    pub duration_ms: u128,
}

#[derive(Debug, Clone)]
pub struct StageMetrics {
    pub index: usize,
    pub label: &'static str,
    pub execution: ExecutionMode,
    pub duration_ms: u128,
    pub tasks: Vec<TaskMetrics>,
}

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_duration_ms: u128,
    pub stages: Vec<StageMetrics>,
    /// Name of the task that finished the pipeline early, if any.
    pub finished_by: Option<String>,
}

impl PipelineMetrics {
    pub fn task_duration_ms(&self, name: &str) -> Option<u128> {
        self.stages
            .iter()
            .flat_map(|stage| stage.tasks.iter())
            .find(|task| task.name == name)
            .map(|task| task.duration_ms)
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.stages
            .iter()
            .flat_map(|stage| stage.tasks.iter())
            .map(|task| task.name.as_str())
            .collect()
    }

    pub fn log_stages(&self) {
        for stage in &self.stages {
            for task in &stage.tasks {
                tracing::debug!(
                    stage = stage.label,
                    task = %task.name,
                    duration_ms = task.duration_ms as u64,
                    "Startup task timing"
                );
            }
        }
        tracing::info!(
            total_ms = self.total_duration_ms as u64,
            finished_by = ?self.finished_by,
            "Startup pipeline finished"
        );
    }
}
