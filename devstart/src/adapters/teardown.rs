//! Full session teardown, run by `devstart stop` and before each start.

use crate::hypervisor::HyperVSession;
use crate::net::NetworkAliasManager;
use crate::ports::{AnalyticsDaemon, Teardown};
use async_trait::async_trait;
use devstart_shared::errors::{DevstartResult, ResultExt};
use std::sync::Arc;

pub struct SessionTeardown {
    analytics_daemon: Arc<dyn AnalyticsDaemon>,
    session: Arc<HyperVSession>,
    aliases: NetworkAliasManager,
    switch: String,
    addrs: Vec<String>,
}

impl SessionTeardown {
    pub fn new(
        analytics_daemon: Arc<dyn AnalyticsDaemon>,
        session: Arc<HyperVSession>,
        aliases: NetworkAliasManager,
        switch: String,
        addrs: Vec<String>,
    ) -> Self {
        Self {
            analytics_daemon,
            session,
            aliases,
            switch,
            addrs,
        }
    }
}

#[async_trait]
impl Teardown for SessionTeardown {
    async fn run(&self) -> DevstartResult<()> {
        match self.analytics_daemon.is_running().await {
            Ok(true) => {
                if let Err(e) = self.analytics_daemon.stop().await {
                    tracing::warn!("Failed to stop analytics daemon: {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to query analytics daemon: {}", e),
        }

        self.session.driver().stop().await.context("stopping vm")?;
        self.session.destroy().await.context("destroying vm")?;
        self.aliases
            .remove_loopback_aliases(&self.switch, &self.addrs)
            .await
            .context("removing aliases")?;

        tracing::info!(switch = %self.switch, "Session torn down");
        Ok(())
    }
}
