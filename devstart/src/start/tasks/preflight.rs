//! Tasks: host memory probe and requirement check (run side by side).

use super::{StartCtx, advance, log_task_error, task_start};
use crate::pipeline::{PipelineTask, TaskFlow};
use crate::start::types::StartupState;
use async_trait::async_trait;
use devstart_shared::errors::DevstartResult;

/// Best-effort snapshot of host memory; failures leave the figure unknown.
pub(crate) struct MemoryProbeTask;

#[async_trait]
impl PipelineTask<StartCtx> for MemoryProbeTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let available = ports
            .profiler
            .available_memory()
            .await
            .inspect_err(|e| tracing::warn!("Failed to read available memory: {}", e))
            .ok();
        let total = ports
            .profiler
            .total_memory()
            .await
            .inspect_err(|e| tracing::warn!("Failed to read total memory: {}", e))
            .ok();

        tracing::debug!(?available, ?total, "Host memory probed");

        let mut ctx = ctx.lock().await;
        ctx.available_memory = available;
        ctx.total_memory = total;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "memory_probe"
    }
}

pub(crate) struct RequirementsTask;

#[async_trait]
impl PipelineTask<StartCtx> for RequirementsTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        ports
            .host
            .check_requirements()
            .await
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::RequirementsChecked).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "requirements_check"
    }
}
