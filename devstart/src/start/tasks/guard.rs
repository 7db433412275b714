//! Tasks: watchdog arming, dependency path resolution, already-running guard.

use super::{StartCtx, advance, log_task_error, task_start};
use crate::analytics::{self, props};
use crate::constants::filenames;
use crate::pipeline::{PipelineTask, TaskFlow};
use crate::start::types::{StartOutcome, StartupState};
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult, ResultExt};
use std::path::{Path, PathBuf};

pub(crate) struct ArmWatchdogTask;

#[async_trait]
impl PipelineTask<StartCtx> for ArmWatchdogTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        task_start(&ctx, task_name).await;

        {
            let mut ctx = ctx.lock().await;
            let listener = ctx.listener.take().ok_or_else(|| {
                DevstartError::Internal("watchdog already armed for this session".into())
            })?;
            let handle = ctx.monitor.arm(listener);
            ctx.watchdog = Some(handle);
        }

        advance(&ctx, StartupState::WatchdogArmed).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "watchdog_arm"
    }
}

/// Picks the dependency archive: `--file` when given, else the cached one.
pub(crate) struct ResolveDepsTask;

#[async_trait]
impl PipelineTask<StartCtx> for ResolveDepsTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        task_start(&ctx, task_name).await;

        let mut ctx = ctx.lock().await;
        let deps_path = match ctx.args.deps_path.clone() {
            Some(explicit) => {
                let path = resolve_explicit(&explicit)
                    .inspect_err(|e| log_task_error(task_name, e))?;
                ctx.options.dependencies.remove(filenames::DEPS_ARCHIVE);
                path
            }
            None => ctx.layout.deps_archive_path(),
        };

        tracing::debug!(path = %deps_path.display(), "Dependency archive resolved");
        ctx.deps_path = Some(deps_path);
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "deps_resolve"
    }
}

fn resolve_explicit(path: &Path) -> DevstartResult<PathBuf> {
    let absolute = std::path::absolute(path)
        .map_err(DevstartError::from)
        .context("determining absolute path to deps file")?;

    if !absolute.exists() {
        return Err(DevstartError::InvalidInput(format!(
            "no file found at: {}",
            absolute.display()
        )));
    }
    Ok(absolute)
}

/// Stops the run early, untouched, when the VM is already up.
pub(crate) struct AlreadyRunningTask;

#[async_trait]
impl PipelineTask<StartCtx> for AlreadyRunningTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let running = ports
            .driver
            .is_running()
            .await
            .context("is running")
            .inspect_err(|e| log_task_error(task_name, e))?;

        if running {
            ports.ui.say("devstart is already running...");
            if let Err(e) = ports
                .analytics
                .event(analytics::START_END, props([("alreadyrunning", true)]))
                .await
            {
                tracing::warn!("Failed to send {} event: {}", analytics::START_END, e);
            }
            ctx.lock().await.outcome = StartOutcome::AlreadyRunning;
            return Ok(TaskFlow::Finish);
        }

        advance(&ctx, StartupState::NotAlreadyRunning).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "running_guard"
    }
}
