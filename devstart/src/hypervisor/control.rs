//! Typed hypervisor control port.
//!
//! Every operation the lifecycle driver needs from the backend, with no
//! backend syntax leaking through. One adapter per real backend implements it
//! (see `PowerShellBackend`).

use async_trait::async_trait;
use devstart_shared::errors::DevstartResult;
use std::path::{Path, PathBuf};

/// Hardware and policy settings applied right after the VM shell exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmProperties {
    pub cpus: u32,
    pub memory_mb: u64,
    /// Fixed-size memory; dynamic memory disabled.
    pub static_memory: bool,
    pub checkpoints: bool,
    pub start_action: StartAction,
    pub stop_action: StopAction,
}

impl VmProperties {
    /// Settings for the session VM: static memory, no checkpoints, never
    /// auto-started, shut down with the host.
    pub fn session(cpus: u32, memory_mb: u64) -> Self {
        Self {
            cpus,
            memory_mb,
            static_memory: true,
            checkpoints: false,
            start_action: StartAction::Nothing,
            stop_action: StopAction::ShutDown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAction {
    Nothing,
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    ShutDown,
    TurnOff,
}

/// Removable or fixed media attached to the VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmMedia {
    OpticalDrive(PathBuf),
    HardDisk(PathBuf),
}

impl VmMedia {
    pub fn path(&self) -> &Path {
        match self {
            VmMedia::OpticalDrive(path) | VmMedia::HardDisk(path) => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDevice {
    OpticalDrive,
    HardDisk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareSettings {
    pub secure_boot: bool,
    pub first_boot_device: BootDevice,
}

/// Serial port bound to a named pipe on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPort {
    pub number: u8,
    pub pipe: String,
}

/// Operations against VMs on the hypervisor, addressed by name.
#[async_trait]
pub trait HypervisorControl: Send + Sync {
    /// Create an unattached, disk-less generation-2 VM shell.
    async fn create_vm(&self, name: &str) -> DevstartResult<()>;

    async fn set_properties(&self, name: &str, properties: &VmProperties) -> DevstartResult<()>;

    async fn attach_media(&self, name: &str, media: &VmMedia) -> DevstartResult<()>;

    /// Names of the network adapters bound to VM `name`.
    async fn list_network_adapters(&self, name: &str) -> DevstartResult<Vec<String>>;

    async fn remove_network_adapter(&self, name: &str, adapter: &str) -> DevstartResult<()>;

    async fn set_firmware(&self, name: &str, firmware: &FirmwareSettings) -> DevstartResult<()>;

    async fn set_serial_port(&self, name: &str, port: &SerialPort) -> DevstartResult<()>;

    /// Whether any VM name starts with `prefix`.
    async fn vm_exists(&self, prefix: &str) -> DevstartResult<bool>;

    /// Backend-reported state text of VM `name`.
    async fn vm_state(&self, name: &str) -> DevstartResult<String>;

    async fn start_vm(&self, name: &str) -> DevstartResult<()>;

    /// Forced power-off.
    async fn turn_off_vm(&self, name: &str) -> DevstartResult<()>;

    /// Forced removal.
    async fn remove_vm(&self, name: &str) -> DevstartResult<()>;
}
