//! Startup orchestration.
//!
//! ## Architecture
//!
//! One table-driven plan; each stage gates the next:
//!
//! ```text
//!   1. WatchdogArm, DepsResolve          (before any host query)
//!   2. MemoryProbe       ─┬─             (best effort)
//!      RequirementsCheck ─┘
//!   3. RunningGuard                      (finish early if already up)
//!   4. PriorTeardown, DirsCreate, NetworkHelperSync, PrivilegedSetup,
//!      AliasesAdd, DepsSync, StateSetup
//!   5. MetadataValidate, ServicesSelect, MemoryAllocate
//!   6. VmStart, ProvisionPing
//!   7. Provision (finish early on --no-provision), AnalyticsDaemonStart,
//!      StartEnd
//! ```
//!
//! The watchdog armed in stage 1 outlives the run; its handle is returned in
//! the [`StartReport`].

mod services;
mod tasks;
mod types;

pub use services::{is_service_supported, validate_selector};
pub use types::{Collaborators, StartOutcome, StartReport, StartupArgs, StartupState};

use crate::options::DevstartOptions;
use crate::pipeline::{
    BoxedTask, ExecutionPlan, PipelineBuilder, PipelineExecutor, PipelineMetrics, Stage,
};
use crate::watchdog::WatchdogListener;
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::sync::Arc;
use tokio::sync::Mutex;

use tasks::{
    AliasesTask, AlreadyRunningTask, AnalyticsDaemonTask, ArmWatchdogTask, CreateDirsTask,
    DependencySyncTask, FinishTask, MemoryAllocateTask, MemoryProbeTask, MetadataTask,
    NetworkHelperTask, PriorInstanceTask, PrivilegedSetupTask, ProvisionPingTask, ProvisionTask,
    RequirementsTask, ResolveDepsTask, ServiceSelectionTask, StartCtx, StateSetupTask,
    VmStartTask,
};
use types::StartPipelineContext;

// ============================================================================
// EXECUTION PLAN
// ============================================================================

fn get_execution_plan() -> ExecutionPlan<StartCtx> {
    let stages: Vec<Stage<BoxedTask<StartCtx>>> = vec![
        Stage::sequential(
            "arm",
            vec![Box::new(ArmWatchdogTask), Box::new(ResolveDepsTask)],
        ),
        Stage::parallel(
            "preflight",
            vec![Box::new(MemoryProbeTask), Box::new(RequirementsTask)],
        ),
        Stage::sequential("running_guard", vec![Box::new(AlreadyRunningTask)]),
        Stage::sequential(
            "host_setup",
            vec![
                Box::new(PriorInstanceTask),
                Box::new(CreateDirsTask),
                Box::new(NetworkHelperTask),
                // The two below need elevated privileges.
                Box::new(PrivilegedSetupTask),
                Box::new(AliasesTask),
                Box::new(DependencySyncTask),
                Box::new(StateSetupTask),
            ],
        ),
        Stage::sequential(
            "metadata",
            vec![
                Box::new(MetadataTask),
                Box::new(ServiceSelectionTask),
                Box::new(MemoryAllocateTask),
            ],
        ),
        Stage::sequential(
            "vm",
            vec![Box::new(VmStartTask), Box::new(ProvisionPingTask)],
        ),
        Stage::sequential(
            "provision",
            vec![
                Box::new(ProvisionTask),
                Box::new(AnalyticsDaemonTask),
                Box::new(FinishTask),
            ],
        ),
    ];

    ExecutionPlan::new(stages)
}

/// Drives one session's startup.
pub struct Orchestrator {
    options: DevstartOptions,
    ports: Collaborators,
    listener: Mutex<Option<WatchdogListener>>,
}

impl Orchestrator {
    /// `listener` is the receiving half of the session's watchdog channel; it
    /// is consumed by the first `execute`.
    pub fn new(options: DevstartOptions, ports: Collaborators, listener: WatchdogListener) -> Self {
        Self {
            options,
            ports,
            listener: Mutex::new(Some(listener)),
        }
    }

    pub async fn execute(&self, args: StartupArgs) -> DevstartResult<StartReport> {
        let listener = self.listener.lock().await.take().ok_or_else(|| {
            DevstartError::Internal("watchdog already armed for this session".into())
        })?;

        tracing::info!(
            cpus = args.cpus,
            memory_mb = args.memory_mb,
            no_provision = args.no_provision,
            "Starting devstart"
        );

        let ctx = StartPipelineContext::new(
            args,
            self.options.clone(),
            self.ports.clone(),
            listener,
        );
        let ctx = Arc::new(Mutex::new(ctx));

        let pipeline = PipelineBuilder::from_plan(get_execution_plan());
        let result = PipelineExecutor::execute(pipeline, Arc::clone(&ctx)).await;

        let mut ctx = ctx.lock().await;
        let metrics: PipelineMetrics = match result {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::error!(state = %ctx.state, "Start failed: {}", e);
                return Err(e);
            }
        };
        metrics.log_stages();

        let watchdog = ctx
            .watchdog
            .take()
            .ok_or_else(|| DevstartError::Internal("watchdog_arm task must run first".into()))?;

        tracing::info!(
            state = %ctx.state,
            outcome = ?ctx.outcome,
            total_ms = metrics.total_duration_ms as u64,
            "Start finished"
        );

        Ok(StartReport {
            state: ctx.state,
            outcome: ctx.outcome,
            metrics,
            memory: ctx.memory.take(),
            watchdog,
        })
    }
}

#[cfg(test)]
mod tests;
