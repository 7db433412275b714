//! Lifecycle driver for the single session VM.
//!
//! The driver is bound to one [`VmSpec`] at construction and composes the
//! hypervisor port into create/start/stop/destroy/query operations. A failed
//! `create_vm` leaves whatever was configured so far in place; the next
//! session's teardown removes it by name.

use crate::hypervisor::control::{
    BootDevice, FirmwareSettings, HypervisorControl, SerialPort, VmMedia, VmProperties,
};
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// State text the backend reports for a running VM.
const RUNNING_MARKER: &str = "Running";

/// Identity and fixed attachments of the session VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSpec {
    pub name: String,
    /// Persistent backing disk produced by the state setup.
    pub disk_path: PathBuf,
    pub serial_port: SerialPort,
}

#[derive(Clone)]
pub struct VmLifecycleDriver {
    hypervisor: Arc<dyn HypervisorControl>,
    spec: VmSpec,
}

impl VmLifecycleDriver {
    pub fn new(hypervisor: Arc<dyn HypervisorControl>, spec: VmSpec) -> Self {
        Self { hypervisor, spec }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Create and fully configure the VM shell.
    ///
    /// Adapter removal is best effort; every other step is mandatory.
    pub async fn create_vm(
        &self,
        cpus: u32,
        memory_mb: u64,
        firmware_path: &Path,
    ) -> DevstartResult<()> {
        let name = self.name();
        tracing::info!(vm = %name, cpus, memory_mb, "Creating VM");

        self.hypervisor
            .create_vm(name)
            .await
            .map_err(|e| hv_err(format!("creating new vm: {e}")))?;

        self.hypervisor
            .set_properties(name, &VmProperties::session(cpus, memory_mb))
            .await
            .map_err(|e| {
                hv_err(format!(
                    "setting vm properties (memoryMB:{memory_mb}, cpus:{cpus}): {e}"
                ))
            })?;

        let firmware = VmMedia::OpticalDrive(firmware_path.to_path_buf());
        self.hypervisor
            .attach_media(name, &firmware)
            .await
            .map_err(|e| {
                hv_err(format!(
                    "adding dvd drive {}: {e}",
                    firmware_path.display()
                ))
            })?;

        self.remove_network_adapters().await;

        let disk = VmMedia::HardDisk(self.spec.disk_path.clone());
        self.hypervisor
            .attach_media(name, &disk)
            .await
            .map_err(|e| hv_err(format!("adding vhd {}: {e}", self.spec.disk_path.display())))?;

        let settings = FirmwareSettings {
            secure_boot: false,
            first_boot_device: BootDevice::OpticalDrive,
        };
        self.hypervisor
            .set_firmware(name, &settings)
            .await
            .map_err(|e| hv_err(format!("setting firmware: {e}")))?;

        self.hypervisor
            .set_serial_port(name, &self.spec.serial_port)
            .await
            .map_err(|e| hv_err(format!("setting com port: {e}")))?;

        tracing::debug!(vm = %name, "VM created");
        Ok(())
    }

    /// The VM is networked through the alias layer, not a VM-attached NIC.
    async fn remove_network_adapters(&self) {
        let name = self.name();
        let adapters = match self.hypervisor.list_network_adapters(name).await {
            Ok(adapters) => adapters,
            Err(e) => {
                tracing::warn!(vm = %name, "Failed to list network adapters: {}", e);
                return;
            }
        };

        for adapter in adapters {
            if let Err(e) = self.hypervisor.remove_network_adapter(name, &adapter).await {
                tracing::warn!(vm = %name, adapter = %adapter, "Failed to remove network adapter: {}", e);
            }
        }
    }

    pub async fn exists(&self) -> DevstartResult<bool> {
        self.hypervisor
            .vm_exists(self.name())
            .await
            .map_err(|e| hv_err(format!("getting vms: {e}")))
    }

    pub async fn start(&self) -> DevstartResult<()> {
        if !self.exists().await? {
            return Err(hv_err(format!(
                "vm with name {} does not exist",
                self.name()
            )));
        }

        self.hypervisor
            .start_vm(self.name())
            .await
            .map_err(|e| hv_err(format!("start-vm: {e}")))?;
        tracing::info!(vm = %self.name(), "VM started");
        Ok(())
    }

    pub async fn stop(&self) -> DevstartResult<()> {
        if !self.exists().await? {
            return Ok(());
        }

        self.hypervisor
            .turn_off_vm(self.name())
            .await
            .map_err(|e| hv_err(format!("stopping vm: {e}")))?;
        tracing::info!(vm = %self.name(), "VM stopped");
        Ok(())
    }

    pub async fn destroy(&self) -> DevstartResult<()> {
        if !self.exists().await? {
            return Ok(());
        }

        self.hypervisor
            .remove_vm(self.name())
            .await
            .map_err(|e| hv_err(format!("removing vm: {e}")))?;
        tracing::info!(vm = %self.name(), "VM removed");
        Ok(())
    }

    pub async fn is_running(&self) -> DevstartResult<bool> {
        if !self.exists().await? {
            return Ok(false);
        }

        let state = self.hypervisor.vm_state(self.name()).await?;
        Ok(state.contains(RUNNING_MARKER))
    }
}

fn hv_err(message: String) -> DevstartError {
    DevstartError::Hypervisor(message)
}
