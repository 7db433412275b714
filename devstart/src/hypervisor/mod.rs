//! Hypervisor control: the typed port, the PowerShell backend, and the
//! lifecycle driver built on top of them.

pub mod control;
pub mod driver;
pub mod powershell;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use control::{
    BootDevice, FirmwareSettings, HypervisorControl, SerialPort, StartAction, StopAction, VmMedia,
    VmProperties,
};
pub use driver::{VmLifecycleDriver, VmSpec};
pub use powershell::{PowerShellBackend, ProcessRunner, ShellRunner};
pub use session::HyperVSession;
