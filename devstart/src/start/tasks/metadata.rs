//! Tasks: metadata compatibility gate, service selection, memory sizing.

use super::{StartCtx, advance, log_task_error, task_start};
use crate::analytics::{self, props};
use crate::constants::{COMPATIBILITY_VERSION, DEFAULT_MEMORY_MB};
use crate::memory::{allocate, bytes_to_mb};
use crate::pipeline::{PipelineTask, TaskFlow};
use crate::start::services::validate_selector;
use crate::start::types::StartupState;
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult, ResultExt};
use serde_json::Value;
use std::path::PathBuf;

fn incompatible(deps_path: &std::path::Path) -> String {
    format!(
        "{} is not compatible with devstart. Please use a compatible file",
        deps_path.display()
    )
}

pub(crate) struct MetadataTask;

#[async_trait]
impl PipelineTask<StartCtx> for MetadataTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let (metadata_path, deps_path, available, total) = {
            let ctx = ctx.lock().await;
            (
                ctx.layout.metadata_path(),
                ctx.deps_path.clone().unwrap_or_else(PathBuf::new),
                ctx.available_memory,
                ctx.total_memory,
            )
        };

        let metadata = ports
            .metadata_reader
            .read(&metadata_path)
            .await
            .with_context(|| format!("{}.", incompatible(&deps_path)))
            .inspect_err(|e| log_task_error(task_name, e))?;

        for (key, value) in [
            ("type", &metadata.deployment_name),
            ("artifact", &metadata.artifact_version),
        ] {
            if let Err(e) = ports.toggle.set_prop(key, value) {
                tracing::warn!(key, "Failed to set analytics property: {}", e);
            }
        }

        if metadata.version != COMPATIBILITY_VERSION {
            let err = DevstartError::Incompatible(incompatible(&deps_path));
            log_task_error(task_name, &err);
            return Err(err);
        }

        if let Err(e) = ports
            .analytics
            .prompt_opt_in_if_needed(&metadata.analytics_message)
            .await
        {
            tracing::warn!("Analytics opt-in prompt failed: {}", e);
        }

        let mb = |bytes: Option<u64>| bytes.map(bytes_to_mb).map_or(Value::Null, Value::from);
        if let Err(e) = ports
            .analytics
            .event(
                analytics::START_BEGIN,
                props([("total memory", mb(total)), ("available memory", mb(available))]),
            )
            .await
        {
            tracing::warn!("Failed to send {} event: {}", analytics::START_BEGIN, e);
        }

        tracing::info!(
            deployment = %metadata.deployment_name,
            artifact = %metadata.artifact_version,
            services = metadata.services.len(),
            "Metadata validated"
        );
        ctx.lock().await.metadata = Some(metadata);
        advance(&ctx, StartupState::MetadataValidated).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "metadata_validate"
    }
}

pub(crate) struct ServiceSelectionTask;

#[async_trait]
impl PipelineTask<StartCtx> for ServiceSelectionTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let (selector, services) = {
            let ctx = ctx.lock().await;
            let services = ctx
                .metadata
                .as_ref()
                .map(|m| m.services.clone())
                .unwrap_or_default();
            (ctx.args.deploy_single_service.clone(), services)
        };

        let Some(selector) = selector.filter(|s| !s.is_empty()) else {
            return Ok(TaskFlow::Continue);
        };

        validate_selector(&selector, &services).inspect_err(|e| log_task_error(task_name, e))?;

        if let Err(e) = ports
            .analytics
            .event(
                analytics::SELECTED_SERVICE,
                props([("services_requested", selector.as_str())]),
            )
            .await
        {
            tracing::warn!("Failed to send {} event: {}", analytics::SELECTED_SERVICE, e);
        }
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "services_select"
    }
}

pub(crate) struct MemoryAllocateTask;

#[async_trait]
impl PipelineTask<StartCtx> for MemoryAllocateTask {
    async fn run(self: Box<Self>, ctx: StartCtx) -> DevstartResult<TaskFlow> {
        let task_name = self.name();
        let ports = task_start(&ctx, task_name).await;

        let (requested, probed, base, deployment) = {
            let ctx = ctx.lock().await;
            let (base, deployment) = match ctx.metadata.as_ref() {
                Some(m) if m.default_memory > 0 => (m.default_memory, m.deployment_name.clone()),
                Some(m) => (DEFAULT_MEMORY_MB, m.deployment_name.clone()),
                None => (DEFAULT_MEMORY_MB, String::new()),
            };
            (ctx.args.memory_mb, ctx.available_memory, base, deployment)
        };

        let available_bytes = match probed {
            Some(bytes) => bytes,
            None => ports
                .profiler
                .available_memory()
                .await
                .context("error retrieving available system memory")
                .inspect_err(|e| log_task_error(task_name, e))?,
        };

        let decision = allocate(requested, base, bytes_to_mb(available_bytes), &deployment);
        for warning in &decision.warnings {
            ports.ui.say(&warning.to_string());
        }
        tracing::info!(
            requested_mb = decision.requested_mb,
            base_mb = decision.base_mb,
            available_mb = decision.available_mb,
            allocated_mb = decision.allocated_mb,
            "VM memory allocated"
        );

        ctx.lock().await.memory = Some(decision);
        advance(&ctx, StartupState::MemoryAllocated).await;
        Ok(TaskFlow::Continue)
    }

    fn name(&self) -> &str {
        "memory_allocate"
    }
}
