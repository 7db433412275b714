//! Collaborator ports the orchestrator is wired with.
//!
//! Each port is a narrow async trait injected as `Arc<dyn _>`. Shipped
//! implementations live in `adapters`; tests substitute fakes.

use crate::analytics::Props;
use crate::metadata::Metadata;
use crate::resource::Catalog;
use crate::start::StartupArgs;
use async_trait::async_trait;
use devstart_shared::errors::DevstartResult;
use std::path::Path;
use std::time::Duration;

/// User-facing progress output.
pub trait Ui: Send + Sync {
    fn say(&self, message: &str);
}

#[async_trait]
pub trait Host: Send + Sync {
    /// Fails when the machine cannot run the VM at all.
    async fn check_requirements(&self) -> DevstartResult<()>;
}

/// Memory figures in bytes.
#[async_trait]
pub trait MemoryProfiler: Send + Sync {
    async fn available_memory(&self) -> DevstartResult<u64>;
    async fn total_memory(&self) -> DevstartResult<u64>;
}

#[async_trait]
pub trait Cache: Send + Sync {
    /// Make every item of `catalog` present locally.
    async fn sync(&self, catalog: &Catalog) -> DevstartResult<()>;
}

/// Full session teardown (the `stop` command).
#[async_trait]
pub trait Teardown: Send + Sync {
    async fn run(&self) -> DevstartResult<()>;
}

#[async_trait]
pub trait Env: Send + Sync {
    async fn create_dirs(&self) -> DevstartResult<()>;
    /// Unpack the dependency archive at `deps_path` into the state dir.
    async fn setup_state(&self, deps_path: &Path) -> DevstartResult<()>;
}

/// OS-specific steps that need elevated privileges.
#[async_trait]
pub trait PrivilegedSetup: Send + Sync {
    async fn setup(&self) -> DevstartResult<()>;
}

#[async_trait]
pub trait HostNet: Send + Sync {
    async fn add_loopback_aliases(&self, switch: &str, addrs: &[String]) -> DevstartResult<()>;
}

/// The session VM as seen by the orchestrator and the watchdog.
#[async_trait]
pub trait VmDriver: Send + Sync {
    async fn start(&self, cpus: u32, memory_mb: u64, firmware: &Path) -> DevstartResult<()>;
    async fn stop(&self) -> DevstartResult<()>;
    async fn is_running(&self) -> DevstartResult<bool>;
}

#[async_trait]
pub trait MetadataReader: Send + Sync {
    async fn read(&self, path: &Path) -> DevstartResult<Metadata>;
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Wait until the VM answers, up to `timeout`.
    async fn ping(&self, timeout: Duration) -> DevstartResult<()>;
}

#[async_trait]
pub trait ProvisionExecutor: Send + Sync {
    async fn execute(&self, args: &StartupArgs) -> DevstartResult<()>;
}

#[async_trait]
pub trait AnalyticsClient: Send + Sync {
    async fn event(&self, name: &str, props: Props) -> DevstartResult<()>;
    async fn prompt_opt_in_if_needed(&self, message: &str) -> DevstartResult<()>;
}

pub trait AnalyticsToggle: Send + Sync {
    fn enabled(&self) -> bool;
    fn set_prop(&self, key: &str, value: &str) -> DevstartResult<()>;
}

#[async_trait]
pub trait AnalyticsDaemon: Send + Sync {
    async fn start(&self) -> DevstartResult<()>;
    async fn stop(&self) -> DevstartResult<()>;
    async fn is_running(&self) -> DevstartResult<bool>;
}

/// Process-terminating exit used by the watchdog's failure path.
pub trait ShutdownHook: Send + Sync {
    fn fatal_exit(&self, code: i32);
}
