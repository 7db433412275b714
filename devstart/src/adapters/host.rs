//! Host checks for Hyper-V: feature availability and elevation.

use crate::hypervisor::powershell::ShellRunner;
use crate::ports::{Host, PrivilegedSetup};
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::sync::Arc;

const HYPERV_FEATURE_QUERY: &str =
    "(Get-WindowsOptionalFeature -FeatureName Microsoft-Hyper-V-All -Online).State";
const ADMIN_QUERY: &str = "([Security.Principal.WindowsPrincipal][Security.Principal.WindowsIdentity]::GetCurrent()).IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)";

pub struct HyperVHost<R> {
    runner: Arc<R>,
}

impl<R: ShellRunner> HyperVHost<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<R: ShellRunner + 'static> Host for HyperVHost<R> {
    async fn check_requirements(&self) -> DevstartResult<()> {
        let state = self.runner.powershell(HYPERV_FEATURE_QUERY).await.map_err(|e| {
            DevstartError::Requirements(format!("unable to query Hyper-V feature: {e}"))
        })?;

        if state.trim() != "Enabled" {
            return Err(DevstartError::Requirements(
                "You must first enable Hyper-V on your machine".into(),
            ));
        }
        tracing::debug!("Hyper-V is enabled");
        Ok(())
    }
}

#[async_trait]
impl<R: ShellRunner + 'static> PrivilegedSetup for HyperVHost<R> {
    async fn setup(&self) -> DevstartResult<()> {
        let answer = self.runner.powershell(ADMIN_QUERY).await?;
        if !answer.trim().eq_ignore_ascii_case("true") {
            return Err(DevstartError::Requirements(
                "Running without admin privileges: you must run devstart from an elevated terminal"
                    .into(),
            ));
        }
        Ok(())
    }
}
