//! Types shared by the start pipeline.

use crate::constants::DEFAULT_CPUS;
use crate::layout::FilesystemLayout;
use crate::memory::MemoryDecision;
use crate::metadata::Metadata;
use crate::options::DevstartOptions;
use crate::pipeline::PipelineMetrics;
use crate::ports::{
    AnalyticsClient, AnalyticsDaemon, AnalyticsToggle, Cache, Env, Host, HostNet, MemoryProfiler,
    MetadataReader, PrivilegedSetup, ProvisionExecutor, Provisioner, ShutdownHook, Teardown, Ui,
    VmDriver,
};
use crate::watchdog::{WatchdogListener, WatchdogMonitor, WatchdogOutcome};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Parameters of one `start` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupArgs {
    /// Docker registries that skip TLS validation, `host:port,host2:port2`.
    pub registries: String,
    /// Comma-separated service flag names, or `all` / `none`.
    pub deploy_single_service: Option<String>,
    /// Explicit dependency archive; replaces the cached download.
    pub deps_path: Option<PathBuf>,
    pub firmware_path: PathBuf,
    pub no_provision: bool,
    pub cpus: u32,
    /// Requested VM memory in MB; 0 picks the base size.
    pub memory_mb: u64,
}

impl StartupArgs {
    pub fn new(firmware_path: PathBuf) -> Self {
        Self {
            registries: String::new(),
            deploy_single_service: None,
            deps_path: None,
            firmware_path,
            no_provision: false,
            cpus: DEFAULT_CPUS,
            memory_mb: 0,
        }
    }
}

/// Progress markers, in the order the pipeline reaches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StartupState {
    Init,
    WatchdogArmed,
    RequirementsChecked,
    NotAlreadyRunning,
    PriorInstanceStopped,
    DirsCreated,
    NetworkHelperStaged,
    PrivilegedSetupDone,
    AliasesConfigured,
    DependenciesStaged,
    StateWritten,
    MetadataValidated,
    MemoryAllocated,
    VmStarted,
    ProvisioningPinged,
    SkippedByFlag,
    Provisioned,
    AnalyticsDaemonStarted,
    Done,
}

impl fmt::Display for StartupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Completed,
    /// The VM was already up; nothing was touched.
    AlreadyRunning,
    /// VM started and reachable, provisioning skipped on request.
    SkippedProvision,
}

#[derive(Debug)]
pub struct StartReport {
    pub state: StartupState,
    pub outcome: StartOutcome,
    pub metrics: PipelineMetrics,
    pub memory: Option<MemoryDecision>,
    /// Resolves once the session's watchdog fires or is disarmed.
    pub watchdog: JoinHandle<WatchdogOutcome>,
}

/// Every collaborator the orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub ui: Arc<dyn Ui>,
    pub host: Arc<dyn Host>,
    pub profiler: Arc<dyn MemoryProfiler>,
    pub cache: Arc<dyn Cache>,
    pub teardown: Arc<dyn Teardown>,
    pub env: Arc<dyn Env>,
    pub privileged: Arc<dyn PrivilegedSetup>,
    pub host_net: Arc<dyn HostNet>,
    pub driver: Arc<dyn VmDriver>,
    pub metadata_reader: Arc<dyn MetadataReader>,
    pub provisioner: Arc<dyn Provisioner>,
    pub provision: Arc<dyn ProvisionExecutor>,
    pub analytics: Arc<dyn AnalyticsClient>,
    pub toggle: Arc<dyn AnalyticsToggle>,
    pub analytics_daemon: Arc<dyn AnalyticsDaemon>,
    pub shutdown: Arc<dyn ShutdownHook>,
}

/// Mutable state threaded through the start tasks.
pub struct StartPipelineContext {
    pub args: StartupArgs,
    /// Per-run copy; the dependency catalog shrinks as items get staged.
    pub options: DevstartOptions,
    pub layout: FilesystemLayout,
    pub ports: Collaborators,
    pub monitor: WatchdogMonitor,
    pub listener: Option<WatchdogListener>,

    pub watchdog: Option<JoinHandle<WatchdogOutcome>>,
    pub deps_path: Option<PathBuf>,
    /// Bytes; `None` when the probe failed.
    pub available_memory: Option<u64>,
    pub total_memory: Option<u64>,
    pub metadata: Option<Metadata>,
    pub memory: Option<MemoryDecision>,
    pub state: StartupState,
    pub outcome: StartOutcome,
}

impl StartPipelineContext {
    pub fn new(
        args: StartupArgs,
        options: DevstartOptions,
        ports: Collaborators,
        listener: WatchdogListener,
    ) -> Self {
        let layout = options.layout();
        let monitor = WatchdogMonitor::new(
            Arc::clone(&ports.driver),
            Arc::clone(&ports.ui),
            Arc::clone(&ports.shutdown),
        );
        Self {
            args,
            options,
            layout,
            ports,
            monitor,
            listener: Some(listener),
            watchdog: None,
            deps_path: None,
            available_memory: None,
            total_memory: None,
            metadata: None,
            memory: None,
            state: StartupState::Init,
            outcome: StartOutcome::Completed,
        }
    }
}
