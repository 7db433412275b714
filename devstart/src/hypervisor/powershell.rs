//! Hyper-V backend reached through PowerShell cmdlets and `netsh`/`ipconfig`.
//!
//! All command text is rendered here and nowhere else. Execution goes through a
//! [`ShellRunner`] so the rendering can be checked without a Windows host.

use crate::hypervisor::control::{
    BootDevice, FirmwareSettings, HypervisorControl, SerialPort, StartAction, StopAction, VmMedia,
    VmProperties,
};
use crate::net::control::HostNetControl;
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::process::Stdio;
use tokio::process::Command;

/// Executes host commands and returns their stdout.
#[async_trait]
pub trait ShellRunner: Send + Sync {
    /// Run a PowerShell script non-interactively.
    async fn powershell(&self, script: &str) -> DevstartResult<String>;

    /// Run `program` directly with `args`.
    async fn exec(&self, program: &str, args: &[String]) -> DevstartResult<String>;
}

/// [`ShellRunner`] backed by real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    async fn run(mut cmd: Command, shown: &str) -> DevstartResult<String> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::trace!(command = %shown, "Running host command");
        let output = cmd.output().await.map_err(|e| {
            DevstartError::External(format!("Failed to spawn {}: {}", shown, e))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DevstartError::External(format!(
                "{} exited with {}: {}",
                shown,
                output.status,
                stderr.trim()
            )));
        }
        Ok(stdout)
    }
}

#[async_trait]
impl ShellRunner for ProcessRunner {
    async fn powershell(&self, script: &str) -> DevstartResult<String> {
        let mut cmd = Command::new("powershell.exe");
        cmd.args(["-NoProfile", "-NonInteractive", "-Command", script]);
        Self::run(cmd, script).await
    }

    async fn exec(&self, program: &str, args: &[String]) -> DevstartResult<String> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        Self::run(cmd, &format!("{} {}", program, args.join(" "))).await
    }
}

/// Hyper-V implementation of both control ports.
pub struct PowerShellBackend<R> {
    runner: R,
}

impl<R: ShellRunner> PowerShellBackend<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn ps(&self, script: String) -> DevstartResult<String> {
        self.runner.powershell(&script).await
    }
}

/// PowerShell single-quoted literal.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn render_properties(name: &str, p: &VmProperties) -> String {
    let start = match p.start_action {
        StartAction::Nothing => "Nothing",
        StartAction::Start => "Start",
    };
    let stop = match p.stop_action {
        StopAction::ShutDown => "ShutDown",
        StopAction::TurnOff => "TurnOff",
    };
    let checkpoints = if p.checkpoints { "Standard" } else { "Disabled" };
    let memory_mode = if p.static_memory {
        "-StaticMemory"
    } else {
        "-DynamicMemory"
    };

    format!(
        "Set-VM -Name {} -AutomaticStartAction {} -AutomaticStopAction {} -CheckpointType {} -MemoryStartupBytes {}MB {} -ProcessorCount {}",
        quote(name),
        start,
        stop,
        checkpoints,
        p.memory_mb,
        memory_mode,
        p.cpus
    )
}

fn render_firmware(name: &str, f: &FirmwareSettings) -> String {
    let device = match f.first_boot_device {
        BootDevice::OpticalDrive => format!("$boot = Get-VMDvdDrive -VMName {}", quote(name)),
        BootDevice::HardDisk => format!("$boot = Get-VMHardDiskDrive -VMName {}", quote(name)),
    };
    let secure_boot = if f.secure_boot { "On" } else { "Off" };
    format!(
        "{}; Set-VMFirmware -VMName {} -EnableSecureBoot {} -FirstBootDevice $boot",
        device,
        quote(name),
        secure_boot
    )
}

fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl<R: ShellRunner> HypervisorControl for PowerShellBackend<R> {
    async fn create_vm(&self, name: &str) -> DevstartResult<()> {
        self.ps(format!("New-VM -Name {} -Generation 2 -NoVHD", quote(name)))
            .await
            .map(drop)
    }

    async fn set_properties(&self, name: &str, properties: &VmProperties) -> DevstartResult<()> {
        self.ps(render_properties(name, properties)).await.map(drop)
    }

    async fn attach_media(&self, name: &str, media: &VmMedia) -> DevstartResult<()> {
        let cmdlet = match media {
            VmMedia::OpticalDrive(_) => "Add-VMDvdDrive",
            VmMedia::HardDisk(_) => "Add-VMHardDiskDrive",
        };
        let path = media.path().to_string_lossy();
        self.ps(format!(
            "{} -VMName {} -Path {}",
            cmdlet,
            quote(name),
            quote(&path)
        ))
        .await
        .map(drop)
    }

    async fn list_network_adapters(&self, name: &str) -> DevstartResult<Vec<String>> {
        let output = self
            .ps(format!(
                "(Get-VMNetworkAdapter -VMName * | Where-Object -FilterScript {{$_.VMName -eq {}}}).Name",
                quote(name)
            ))
            .await?;
        Ok(non_empty_lines(&output))
    }

    async fn remove_network_adapter(&self, name: &str, adapter: &str) -> DevstartResult<()> {
        self.ps(format!(
            "Remove-VMNetworkAdapter -VMName {} -Name {}",
            quote(name),
            quote(adapter)
        ))
        .await
        .map(drop)
    }

    async fn set_firmware(&self, name: &str, firmware: &FirmwareSettings) -> DevstartResult<()> {
        self.ps(render_firmware(name, firmware)).await.map(drop)
    }

    async fn set_serial_port(&self, name: &str, port: &SerialPort) -> DevstartResult<()> {
        self.ps(format!(
            "Set-VMComPort -VMName {} -Number {} -Path {}",
            quote(name),
            port.number,
            quote(&port.pipe)
        ))
        .await
        .map(drop)
    }

    async fn vm_exists(&self, prefix: &str) -> DevstartResult<bool> {
        let output = self
            .ps(format!("Get-VM -Name {}", quote(&format!("{prefix}*"))))
            .await?;
        Ok(!output.trim().is_empty())
    }

    async fn vm_state(&self, name: &str) -> DevstartResult<String> {
        self.ps(format!(
            "Get-VM -Name {} | Format-List -Property State",
            quote(name)
        ))
        .await
    }

    async fn start_vm(&self, name: &str) -> DevstartResult<()> {
        self.ps(format!("Start-VM -Name {}", quote(name)))
            .await
            .map(drop)
    }

    async fn turn_off_vm(&self, name: &str) -> DevstartResult<()> {
        self.ps(format!("Stop-VM -Name {} -TurnOff", quote(name)))
            .await
            .map(drop)
    }

    async fn remove_vm(&self, name: &str) -> DevstartResult<()> {
        self.ps(format!("Remove-VM -Name {} -Force", quote(name)))
            .await
            .map(drop)
    }
}

#[async_trait]
impl<R: ShellRunner> HostNetControl for PowerShellBackend<R> {
    async fn switch_exists(&self, prefix: &str) -> DevstartResult<bool> {
        let output = self
            .ps(format!("Get-VMSwitch -Name {}", quote(&format!("{prefix}*"))))
            .await?;
        Ok(!output.trim().is_empty())
    }

    async fn create_internal_switch(&self, name: &str, notes: &str) -> DevstartResult<()> {
        self.ps(format!(
            "New-VMSwitch -Name {} -SwitchType Internal -Notes {}",
            quote(name),
            quote(notes)
        ))
        .await
        .map(drop)
    }

    async fn remove_switch(&self, name: &str) -> DevstartResult<()> {
        self.ps(format!("Remove-VMSwitch -Name {} -Force", quote(name)))
            .await
            .map(drop)
    }

    async fn interface_config(&self) -> DevstartResult<String> {
        self.runner.exec("ipconfig", &[]).await
    }

    async fn add_address(&self, switch: &str, address: &str, netmask: &str) -> DevstartResult<()> {
        let args = [
            "interface".to_string(),
            "ip".to_string(),
            "add".to_string(),
            "address".to_string(),
            format!("vEthernet ({switch})"),
            address.to_string(),
            netmask.to_string(),
        ];
        self.runner.exec("netsh", &args).await.map(drop)
    }
}
