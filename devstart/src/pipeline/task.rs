//! The unit of work a stage schedules.

use async_trait::async_trait;
use devstart_shared::errors::DevstartResult;

/// What the executor should do after a task succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFlow {
    /// Run the next task.
    Continue,
    /// Stop the pipeline with success; later stages are skipped.
    Finish,
}

/// A task consumes itself; the context handle is cloned into every task of a
/// stage.
#[async_trait]
pub trait PipelineTask<Ctx>: Send + Sync {
    async fn run(self: Box<Self>, ctx: Ctx) -> DevstartResult<TaskFlow>;

    /// Stable snake_case name used in logs and metrics.
    fn name(&self) -> &str;
}

pub type BoxedTask<Ctx> = Box<dyn PipelineTask<Ctx>>;
