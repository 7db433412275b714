//! Loopback-style address aliases on the session's host-only switch.
//!
//! Alias visibility settles asynchronously after `add_address` returns, so each
//! newly added address is polled until the host reports it.

use crate::constants::{network, session, timeouts};
use crate::net::control::HostNetControl;
use crate::ports::HostNet;
use crate::util::{WaitError, wait_until};
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::sync::Arc;
use std::time::Duration;

/// How long and how often to poll for a new alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasWaitPolicy {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for AliasWaitPolicy {
    fn default() -> Self {
        Self {
            interval: timeouts::ALIAS_POLL_INTERVAL,
            deadline: timeouts::ALIAS_VISIBLE,
        }
    }
}

#[derive(Clone)]
pub struct NetworkAliasManager {
    control: Arc<dyn HostNetControl>,
    policy: AliasWaitPolicy,
}

impl NetworkAliasManager {
    pub fn new(control: Arc<dyn HostNetControl>) -> Self {
        Self::with_policy(control, AliasWaitPolicy::default())
    }

    pub fn with_policy(control: Arc<dyn HostNetControl>, policy: AliasWaitPolicy) -> Self {
        Self { control, policy }
    }

    /// Ensure `switch` exists and every address in `addrs` is bound to it.
    ///
    /// Safe to call repeatedly: present switches and addresses are left alone.
    pub async fn add_loopback_aliases(&self, switch: &str, addrs: &[String]) -> DevstartResult<()> {
        tracing::info!(switch = %switch, addrs = ?addrs, "Setting up IP aliases");

        self.create_switch_if_missing(switch).await?;

        for addr in addrs {
            if alias_exists(self.control.as_ref(), addr).await? {
                tracing::debug!(addr = %addr, "Alias already present");
                continue;
            }
            self.add_alias(switch, addr).await?;
        }
        Ok(())
    }

    /// Remove the session switch, taking its aliases with it.
    pub async fn remove_loopback_aliases(&self, switch: &str, addrs: &[String]) -> DevstartResult<()> {
        if !self.control.switch_exists(switch).await? {
            return Ok(());
        }

        self.control.remove_switch(switch).await.map_err(|e| {
            DevstartError::Network(format!("removing switch {switch}: {e}"))
        })?;
        tracing::info!(switch = %switch, addrs = ?addrs, "Removed IP aliases");
        Ok(())
    }

    async fn create_switch_if_missing(&self, switch: &str) -> DevstartResult<()> {
        if self.control.switch_exists(switch).await? {
            return Ok(());
        }

        self.control
            .create_internal_switch(switch, session::SWITCH_NOTES)
            .await
            .map_err(|e| DevstartError::Network(format!("creating switch {switch}: {e}")))?;
        tracing::debug!(switch = %switch, "Created internal switch");
        Ok(())
    }

    async fn add_alias(&self, switch: &str, addr: &str) -> DevstartResult<()> {
        self.control
            .add_address(switch, addr, network::ALIAS_NETMASK)
            .await
            .map_err(|e| {
                DevstartError::Network(format!(
                    "failed to add network alias: vEthernet ({switch}), {addr}: {e}"
                ))
            })?;

        let control = Arc::clone(&self.control);
        let target = addr.to_string();
        let probe = move || {
            let control = Arc::clone(&control);
            let target = target.clone();
            async move { alias_exists(control.as_ref(), &target).await }
        };

        match wait_until(probe, self.policy.interval, self.policy.deadline).await {
            Ok(()) => {
                tracing::debug!(addr = %addr, "Alias visible");
                Ok(())
            }
            Err(WaitError::TimedOut(_)) => Err(DevstartError::Timeout(format!(
                "timed out waiting for alias {addr}"
            ))),
            Err(WaitError::Probe(e)) => Err(e),
        }
    }
}

#[async_trait]
impl HostNet for NetworkAliasManager {
    async fn add_loopback_aliases(&self, switch: &str, addrs: &[String]) -> DevstartResult<()> {
        NetworkAliasManager::add_loopback_aliases(self, switch, addrs).await
    }
}

async fn alias_exists(control: &dyn HostNetControl, addr: &str) -> DevstartResult<bool> {
    let config = control.interface_config().await?;
    Ok(contains_address(&config, addr))
}

/// Whole-token match, so `10.144.0.4` does not match `10.144.0.40`.
fn contains_address(config: &str, addr: &str) -> bool {
    config
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .any(|token| token == addr)
}
