//! The session VM driver handed to the orchestrator.
//!
//! Wraps the lifecycle driver with the per-start housekeeping: a stale VM of
//! the same name is destroyed and the proxy settings are rewritten before the
//! new VM is created.

use crate::hypervisor::driver::VmLifecycleDriver;
use crate::net::proxy::{ProxyConfig, write_http_config};
use crate::ports::VmDriver;
use async_trait::async_trait;
use devstart_shared::errors::{DevstartResult, ResultExt};
use std::path::{Path, PathBuf};

pub struct HyperVSession {
    driver: VmLifecycleDriver,
    proxy_path: PathBuf,
    /// Addresses that always bypass the host proxy.
    local_ips: Vec<String>,
}

impl HyperVSession {
    pub fn new(driver: VmLifecycleDriver, proxy_path: PathBuf, local_ips: Vec<String>) -> Self {
        Self {
            driver,
            proxy_path,
            local_ips,
        }
    }

    pub fn driver(&self) -> &VmLifecycleDriver {
        &self.driver
    }

    /// Remove the VM entirely; used by teardown.
    pub async fn destroy(&self) -> DevstartResult<()> {
        self.driver.destroy().await
    }

    fn write_proxy_config(&self) -> DevstartResult<()> {
        let ips: Vec<&str> = self.local_ips.iter().map(String::as_str).collect();
        write_http_config(&self.proxy_path, &ProxyConfig::from_env(&ips))
    }
}

#[async_trait]
impl VmDriver for HyperVSession {
    async fn start(&self, cpus: u32, memory_mb: u64, firmware: &Path) -> DevstartResult<()> {
        self.driver.destroy().await.context("removing stale vm")?;
        self.write_proxy_config().context("writing http proxy config")?;
        self.driver
            .create_vm(cpus, memory_mb, firmware)
            .await
            .context("creating vm")?;
        self.driver.start().await.context("starting vm")
    }

    async fn stop(&self) -> DevstartResult<()> {
        self.driver.stop().await
    }

    async fn is_running(&self) -> DevstartResult<bool> {
        self.driver.is_running().await
    }
}
