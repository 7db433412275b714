//! Tasks: VM start and the readiness ping.

use super::{StartCtx, advance, log_task_error, task_start};
use crate::constants::timeouts;
use crate::pipeline::{PipelineTask, TaskFlow};
use crate::start::types::StartupState;
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult, ResultExt};

pub(crate) struct VmStartTask;

#[async_trait]
impl PipelineTask<StartCtx> for VmStartTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let (cpus, firmware, memory_mb) = {
            let ctx = ctx.lock().await;
            let memory_mb = ctx
                .memory
                .as_ref()
                .map(|d| d.allocated_mb)
                .ok_or_else(|| {
                    DevstartError::Internal("memory_allocate task must run first".into())
                })?;
            (ctx.args.cpus, ctx.args.firmware_path.clone(), memory_mb)
        };

        ports.ui.say("Creating the VM...");
        ports
            .driver
            .start(cpus, memory_mb, &firmware)
            .await
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::VmStarted).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "vm_start"
    }
}

pub(crate) struct ProvisionPingTask;

#[async_trait]
impl PipelineTask<StartCtx> for ProvisionPingTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        ports.ui.say("Waiting for the VM...");
        ports
            .provisioner
            .ping(timeouts::PROVISION_PING)
            .await
            .context("timed out waiting for the VM")
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::ProvisioningPinged).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "provision_ping"
    }
}
