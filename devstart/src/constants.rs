//! Fixed names, tags and timings shared across the crate.

use std::time::Duration;

/// Compatibility tag the dependency archive metadata must carry.
pub const COMPATIBILITY_VERSION: &str = "v4";

/// Base VM memory in MB when metadata does not override it.
pub const DEFAULT_MEMORY_MB: u64 = 4192;

pub const DEFAULT_CPUS: u32 = 4;

/// Session identity on the hypervisor.
pub mod session {
    pub const VM_NAME: &str = "devstart";
    pub const SWITCH_NAME: &str = "devstart-nat";
    pub const SWITCH_NOTES: &str = "Switch for devstart networking";
    /// Console pipe the VM serial port is bound to for log capture.
    pub const COM_PIPE: &str = r"\\.\pipe\devstart-com";
    pub const COM_PORT_NUMBER: u8 = 1;
}

pub mod network {
    pub const DIRECTOR_IP: &str = "10.144.0.4";
    pub const ROUTER_IP: &str = "10.144.0.34";
    pub const HOST_IP: &str = "10.144.0.1";
    /// Aliases are bound with a full-host mask.
    pub const ALIAS_NETMASK: &str = "255.255.255.255";
    /// Port probed on the director to decide the VM is reachable.
    pub const DIRECTOR_PING_PORT: u16 = 9999;
}

pub mod filenames {
    pub const DEPS_ARCHIVE: &str = "devstart-deps.tgz";
    pub const NETWORK_HELPER: &str = "devstart-network-helper";
    pub const METADATA: &str = "metadata.json";
    pub const DISK: &str = "disk.vhdx";
    pub const EFI_ISO: &str = "devstart-efi-v2.iso";
    pub const HTTP_PROXY: &str = "http_proxy.json";
    pub const CONFIG: &str = "config.json";
    pub const ANALYTICS: &str = "analytics.json";
    pub const PROVISION_SCRIPT: &str = "provision";
}

pub mod timeouts {
    use super::Duration;

    /// Deadline for the provisioning readiness probe.
    pub const PROVISION_PING: Duration = Duration::from_secs(120);
    pub const PROVISION_PING_INTERVAL: Duration = Duration::from_secs(1);
    /// Deadline for a freshly added alias to show up on the host.
    pub const ALIAS_VISIBLE: Duration = Duration::from_secs(60);
    pub const ALIAS_POLL_INTERVAL: Duration = Duration::from_secs(3);
}

/// Exit status used when the watchdog tears the session down.
pub const WATCHDOG_EXIT_CODE: i32 = 128;

