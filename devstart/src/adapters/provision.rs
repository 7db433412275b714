//! VM readiness probe and the provisioning script runner.

use crate::constants::timeouts;
use crate::ports::{ProvisionExecutor, Provisioner};
use crate::start::StartupArgs;
use crate::util::{WaitError, wait_until};
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpStream;

/// Upper bound on a single connect attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Considers the VM ready once a TCP connect to `addr` succeeds.
pub struct TcpProvisioner {
    addr: String,
    interval: Duration,
}

impl TcpProvisioner {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            interval: timeouts::PROVISION_PING_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl Provisioner for TcpProvisioner {
    async fn ping(&self, timeout: Duration) -> DevstartResult<()> {
        let addr = self.addr.clone();
        let probe = move || {
            let addr = addr.clone();
            async move {
                match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
                    Ok(Ok(_)) => Ok(true),
                    Ok(Err(e)) => {
                        tracing::trace!(addr = %addr, "Connect failed: {}", e);
                        Ok(false)
                    }
                    Err(_) => Ok(false),
                }
            }
        };

        match wait_until(probe, self.interval, timeout).await {
            Ok(()) => {
                tracing::info!(addr = %self.addr, "VM is reachable");
                Ok(())
            }
            Err(WaitError::TimedOut(after)) => Err(DevstartError::Timeout(format!(
                "no answer from {} after {:?}",
                self.addr, after
            ))),
            Err(WaitError::Probe(e)) => Err(e),
        }
    }
}

/// Runs the provisioning script shipped in the bin directory.
///
/// Startup arguments are passed as `DEVSTART_*` environment variables.
pub struct ScriptProvision {
    script: PathBuf,
    state_dir: PathBuf,
}

impl ScriptProvision {
    pub fn new(script: PathBuf, state_dir: PathBuf) -> Self {
        Self { script, state_dir }
    }

    fn environment(&self, args: &StartupArgs) -> Vec<(&'static str, String)> {
        let mut env = vec![
            ("DEVSTART_STATE_DIR", self.state_dir.display().to_string()),
            ("DEVSTART_REGISTRIES", args.registries.clone()),
            ("DEVSTART_CPUS", args.cpus.to_string()),
            ("DEVSTART_MEMORY_MB", args.memory_mb.to_string()),
        ];
        if let Some(services) = &args.deploy_single_service {
            env.push(("DEVSTART_SERVICES", services.clone()));
        }
        env
    }
}

#[async_trait]
impl ProvisionExecutor for ScriptProvision {
    async fn execute(&self, args: &StartupArgs) -> DevstartResult<()> {
        tracing::info!(script = %self.script.display(), "Provisioning VM");

        let status = tokio::process::Command::new(&self.script)
            .envs(self.environment(args))
            .status()
            .await
            .map_err(|e| {
                DevstartError::External(format!(
                    "failed to run {}: {}",
                    self.script.display(),
                    e
                ))
            })?;

        if !status.success() {
            return Err(DevstartError::External(format!(
                "provisioning failed with {status}"
            )));
        }
        Ok(())
    }
}
