//! Tasks: provisioning, analytics daemon, completion event.

use super::{StartCtx, advance, log_task_error, task_start};
use crate::analytics::{self, Props};
use crate::pipeline::{PipelineTask, TaskFlow};
use crate::start::types::{StartOutcome, StartupState};
use async_trait::async_trait;
use devstart_shared::errors::DevstartResult;

pub(crate) struct ProvisionTask;

#[async_trait]
impl PipelineTask<StartCtx> for ProvisionTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let args = ctx.lock().await.args.clone();
        if args.no_provision {
            ports.ui.say(
                "VM will not be provisioned because '-n' (no-provision) flag was specified.",
            );
            ctx.lock().await.outcome = StartOutcome::SkippedProvision;
            advance(&ctx, StartupState::SkippedByFlag).await;
            return Ok(TaskFlow::Finish);
        }

        ports
            .provision
            .execute(&args)
            .await
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::Provisioned).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "provision"
    }
}

/// Starts the analytics daemon when the user opted in. Never fails the run.
pub(crate) struct AnalyticsDaemonTask;

#[async_trait]
impl PipelineTask<StartCtx> for AnalyticsDaemonTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        if ports.toggle.enabled() {
            match ports.analytics_daemon.start().await {
                Ok(()) => tracing::debug!("Analytics daemon started"),
                Err(e) => tracing::warn!("Failed to start analytics daemon: {}", e),
            }
        }

        advance(&ctx, StartupState::AnalyticsDaemonStarted).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "analytics_daemon_start"
    }
}

pub(crate) struct FinishTask;

#[async_trait]
impl PipelineTask<StartCtx> for FinishTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        if let Err(e) = ports.analytics.event(analytics::START_END, Props::new()).await {
            tracing::warn!("Failed to send {} event: {}", analytics::START_END, e);
        }

        advance(&ctx, StartupState::Done).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "start_end"
    }
}
