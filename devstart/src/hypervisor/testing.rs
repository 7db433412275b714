//! In-memory hypervisor for driver and orchestrator tests.

use crate::hypervisor::control::{
    FirmwareSettings, HypervisorControl, SerialPort, VmMedia, VmProperties,
};
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Mutating calls observed by the fake, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HvCall {
    Create(String),
    SetProperties(VmProperties),
    Attach(VmMedia),
    ListAdapters,
    RemoveAdapter(String),
    SetFirmware(FirmwareSettings),
    SetSerial(SerialPort),
    Start,
    TurnOff,
    Remove,
}

#[derive(Default)]
struct FakeState {
    /// VM name -> running.
    vms: HashMap<String, bool>,
    adapters: HashMap<String, Vec<String>>,
    calls: Vec<HvCall>,
    failing: HashSet<&'static str>,
}

#[derive(Default)]
pub struct FakeHypervisor {
    state: Mutex<FakeState>,
}

impl FakeHypervisor {
    pub fn add_adapter(&self, vm: &str, adapter: &str) {
        self.state
            .lock()
            .unwrap()
            .adapters
            .entry(vm.to_string())
            .or_default()
            .push(adapter.to_string());
    }

    /// Make operation `op` fail from now on.
    pub fn fail_on(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    /// Seed a VM that already exists.
    pub fn insert_vm(&self, name: &str, running: bool) {
        self.state
            .lock()
            .unwrap()
            .vms
            .insert(name.to_string(), running);
    }

    pub fn calls(&self) -> Vec<HvCall> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, op: &'static str, call: Option<HvCall>) -> DevstartResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(call) = call {
            state.calls.push(call);
        }
        if state.failing.contains(op) {
            return Err(DevstartError::External(format!("{op} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl HypervisorControl for FakeHypervisor {
    async fn create_vm(&self, name: &str) -> DevstartResult<()> {
        self.record("create_vm", Some(HvCall::Create(name.to_string())))?;
        self.state.lock().unwrap().vms.insert(name.to_string(), false);
        Ok(())
    }

    async fn set_properties(&self, _name: &str, properties: &VmProperties) -> DevstartResult<()> {
        self.record(
            "set_properties",
            Some(HvCall::SetProperties(properties.clone())),
        )
    }

    async fn attach_media(&self, _name: &str, media: &VmMedia) -> DevstartResult<()> {
        let op = match media {
            VmMedia::OpticalDrive(_) => "attach_optical_drive",
            VmMedia::HardDisk(_) => "attach_hard_disk",
        };
        self.record(op, Some(HvCall::Attach(media.clone())))
    }

    async fn list_network_adapters(&self, name: &str) -> DevstartResult<Vec<String>> {
        self.record("list_network_adapters", Some(HvCall::ListAdapters))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .adapters
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_network_adapter(&self, name: &str, adapter: &str) -> DevstartResult<()> {
        self.record(
            "remove_network_adapter",
            Some(HvCall::RemoveAdapter(adapter.to_string())),
        )?;
        if let Some(list) = self.state.lock().unwrap().adapters.get_mut(name) {
            list.retain(|a| a != adapter);
        }
        Ok(())
    }

    async fn set_firmware(&self, _name: &str, firmware: &FirmwareSettings) -> DevstartResult<()> {
        self.record("set_firmware", Some(HvCall::SetFirmware(firmware.clone())))
    }

    async fn set_serial_port(&self, _name: &str, port: &SerialPort) -> DevstartResult<()> {
        self.record("set_serial_port", Some(HvCall::SetSerial(port.clone())))
    }

    async fn vm_exists(&self, prefix: &str) -> DevstartResult<bool> {
        self.record("vm_exists", None)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .vms
            .keys()
            .any(|name| name.starts_with(prefix)))
    }

    async fn vm_state(&self, name: &str) -> DevstartResult<String> {
        self.record("vm_state", None)?;
        let running = self
            .state
            .lock()
            .unwrap()
            .vms
            .get(name)
            .copied()
            .unwrap_or(false);
        Ok(if running {
            "\r\nState : Running\r\n".into()
        } else {
            "\r\nState : Off\r\n".into()
        })
    }

    async fn start_vm(&self, name: &str) -> DevstartResult<()> {
        self.record("start_vm", Some(HvCall::Start))?;
        self.state.lock().unwrap().vms.insert(name.to_string(), true);
        Ok(())
    }

    async fn turn_off_vm(&self, name: &str) -> DevstartResult<()> {
        self.record("turn_off_vm", Some(HvCall::TurnOff))?;
        if let Some(running) = self.state.lock().unwrap().vms.get_mut(name) {
            *running = false;
        }
        Ok(())
    }

    async fn remove_vm(&self, name: &str) -> DevstartResult<()> {
        self.record("remove_vm", Some(HvCall::Remove))?;
        self.state.lock().unwrap().vms.remove(name);
        Ok(())
    }
}
