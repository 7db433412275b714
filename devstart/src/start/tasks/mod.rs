//! Start pipeline tasks.
//!
//! Each task grabs what it needs from the context, releases the lock, calls
//! its collaborators, then records its result and the state it reached.

mod environment;
mod guard;
mod metadata;
mod preflight;
mod provision;
mod vm;

pub(crate) use environment::{
    AliasesTask, CreateDirsTask, DependencySyncTask, NetworkHelperTask, PriorInstanceTask,
    PrivilegedSetupTask, StateSetupTask,
};
pub(crate) use guard::{AlreadyRunningTask, ArmWatchdogTask, ResolveDepsTask};
pub(crate) use metadata::{MemoryAllocateTask, MetadataTask, ServiceSelectionTask};
pub(crate) use preflight::{MemoryProbeTask, RequirementsTask};
pub(crate) use provision::{AnalyticsDaemonTask, FinishTask, ProvisionTask};
pub(crate) use vm::{ProvisionPingTask, VmStartTask};

use crate::start::types::{Collaborators, StartPipelineContext, StartupState};
use devstart_shared::errors::DevstartError;
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) type StartCtx = Arc<Mutex<StartPipelineContext>>;

/// Log the task start and hand back the collaborators.
pub(crate) async fn task_start(ctx: &StartCtx, task_name: &str) -> Collaborators {
    let ctx = ctx.lock().await;
    tracing::debug!(task = task_name, state = %ctx.state, "Starting task");
    ctx.ports.clone()
}

pub(crate) fn log_task_error(task_name: &str, error: &DevstartError) {
    tracing::error!(task = task_name, "Task failed: {}", error);
}

/// Record that `state` was reached. States only move forward.
pub(crate) async fn advance(ctx: &StartCtx, state: StartupState) {
    let mut ctx = ctx.lock().await;
    if state > ctx.state {
        ctx.state = state;
    }
    tracing::info!(state = %state, "Startup state reached");
}
