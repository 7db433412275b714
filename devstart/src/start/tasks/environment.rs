//! Tasks that prepare the host: teardown of the previous session, directories,
//! the network helper, privileged setup, aliases, dependency sync and state.

use super::{StartCtx, advance, log_task_error, task_start};
use crate::constants::filenames;
use crate::pipeline::{PipelineTask, TaskFlow};
use crate::resource::Catalog;
use crate::start::types::StartupState;
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult, ResultExt};

/// Always tears down, even when nothing seems to be left over.
pub(crate) struct PriorInstanceTask;

#[async_trait]
impl PipelineTask<StartCtx> for PriorInstanceTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        ports
            .teardown
            .run()
            .await
            .context("stopping devstart")
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::PriorInstanceStopped).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "prior_teardown"
    }
}

pub(crate) struct CreateDirsTask;

#[async_trait]
impl PipelineTask<StartCtx> for CreateDirsTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        ports
            .env
            .create_dirs()
            .await
            .context("setting up devstart home dir")
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::DirsCreated).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "dirs_create"
    }
}

/// Fetches the network helper ahead of the privileged step that installs it.
pub(crate) struct NetworkHelperTask;

#[async_trait]
impl PipelineTask<StartCtx> for NetworkHelperTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let helper = ctx
            .lock()
            .await
            .options
            .dependencies
            .lookup(filenames::NETWORK_HELPER)
            .cloned();

        if let Some(helper) = helper {
            ports.ui.say("Downloading Network Helper...");
            ports
                .cache
                .sync(&Catalog::single(helper))
                .await
                .context("unable to download network helper")
                .inspect_err(|e| log_task_error(task_name, e))?;

            ctx.lock()
                .await
                .options
                .dependencies
                .remove(filenames::NETWORK_HELPER);
        }

        advance(&ctx, StartupState::NetworkHelperStaged).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "network_helper_sync"
    }
}

pub(crate) struct PrivilegedSetupTask;

#[async_trait]
impl PipelineTask<StartCtx> for PrivilegedSetupTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        ports
            .privileged
            .setup()
            .await
            .context("privileged setup")
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::PrivilegedSetupDone).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "privileged_setup"
    }
}

pub(crate) struct AliasesTask;

#[async_trait]
impl PipelineTask<StartCtx> for AliasesTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let (switch, addrs) = {
            let ctx = ctx.lock().await;
            (ctx.options.switch_name.clone(), ctx.options.alias_addresses())
        };

        ports
            .host_net
            .add_loopback_aliases(&switch, &addrs)
            .await
            .context("adding aliases")
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::AliasesConfigured).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "aliases_add"
    }
}

pub(crate) struct DependencySyncTask;

#[async_trait]
impl PipelineTask<StartCtx> for DependencySyncTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let catalog = ctx.lock().await.options.dependencies.clone();

        ports.ui.say("Downloading Resources...");
        ports
            .cache
            .sync(&catalog)
            .await
            .context("unable to sync assets")
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::DependenciesStaged).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "deps_sync"
    }
}

pub(crate) struct StateSetupTask;

#[async_trait]
impl PipelineTask<StartCtx> for StateSetupTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let deps_path = ctx
            .lock()
            .await
            .deps_path
            .clone()
            .ok_or_else(|| DevstartError::Internal("deps_resolve task must run first".into()))?;

        ports.ui.say("Setting State...");
        ports
            .env
            .setup_state(&deps_path)
            .await
            .context("unable to setup directories")
            .inspect_err(|e| log_task_error(task_name, e))?;

        advance(&ctx, StartupState::StateWritten).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "state_setup"
    }
}
