//! Shipped collaborator implementations and the wiring that assembles them.

pub mod analytics;
pub mod cache;
pub mod console;
pub mod env;
pub mod host;
pub mod metadata;
pub mod profiler;
pub mod provision;
pub mod teardown;

pub use analytics::{FileAnalyticsToggle, NoopAnalyticsDaemon, TracingAnalytics};
pub use cache::HttpCache;
pub use console::{ConsoleUi, ProcessExit};
pub use env::FsEnv;
pub use host::HyperVHost;
pub use metadata::JsonMetadataReader;
pub use profiler::SysinfoProfiler;
pub use provision::{ScriptProvision, TcpProvisioner};
pub use teardown::SessionTeardown;

use crate::constants::{network, session};
use crate::hypervisor::{
    HyperVSession, HypervisorControl, PowerShellBackend, ProcessRunner, SerialPort,
    VmLifecycleDriver, VmSpec,
};
use crate::net::{HostNetControl, NetworkAliasManager};
use crate::options::DevstartOptions;
use crate::ports::{AnalyticsDaemon, Ui};
use crate::start::Collaborators;
use devstart_shared::errors::DevstartResult;
use std::sync::Arc;

/// The session VM driver for `options` on top of `hypervisor`.
pub fn vm_session(options: &DevstartOptions, hypervisor: Arc<dyn HypervisorControl>) -> HyperVSession {
    let layout = options.layout();
    let driver = VmLifecycleDriver::new(
        hypervisor,
        VmSpec {
            name: options.vm_name.clone(),
            disk_path: layout.disk_path(),
            serial_port: SerialPort {
                number: session::COM_PORT_NUMBER,
                pipe: session::COM_PIPE.to_string(),
            },
        },
    );
    HyperVSession::new(driver, layout.http_proxy_path(), options.proxy_exclusions())
}

/// Build the production collaborator set for `options`.
pub fn collaborators(options: &DevstartOptions) -> DevstartResult<Collaborators> {
    let layout = options.layout();
    let ui: Arc<dyn Ui> = Arc::new(ConsoleUi);

    let backend = Arc::new(PowerShellBackend::new(ProcessRunner));
    let host = Arc::new(HyperVHost::new(Arc::new(ProcessRunner)));

    let vm = Arc::new(vm_session(
        options,
        Arc::clone(&backend) as Arc<dyn HypervisorControl>,
    ));
    let aliases = NetworkAliasManager::new(backend as Arc<dyn HostNetControl>);

    let toggle = Arc::new(FileAnalyticsToggle::load(layout.analytics_path()));
    let analytics_daemon: Arc<dyn AnalyticsDaemon> = Arc::new(NoopAnalyticsDaemon);

    let teardown = SessionTeardown::new(
        Arc::clone(&analytics_daemon),
        Arc::clone(&vm),
        aliases.clone(),
        options.switch_name.clone(),
        options.alias_addresses(),
    );

    Ok(Collaborators {
        ui: Arc::clone(&ui),
        host: host.clone(),
        profiler: Arc::new(SysinfoProfiler),
        cache: Arc::new(HttpCache::new(layout.cache_dir())?),
        teardown: Arc::new(teardown),
        env: Arc::new(FsEnv::new(layout.clone())),
        privileged: host,
        host_net: Arc::new(aliases),
        driver: vm,
        metadata_reader: Arc::new(JsonMetadataReader),
        provisioner: Arc::new(TcpProvisioner::new(format!(
            "{}:{}",
            options.director_ip,
            network::DIRECTOR_PING_PORT
        ))),
        provision: Arc::new(ScriptProvision::new(
            layout.provision_script_path(),
            layout.state_dir(),
        )),
        analytics: Arc::new(TracingAnalytics::new(Arc::clone(&toggle), ui)),
        toggle,
        analytics_daemon,
        shutdown: Arc::new(ProcessExit),
    })
}
