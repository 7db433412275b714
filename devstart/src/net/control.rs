//! Host networking control port used by the alias manager.

use async_trait::async_trait;
use devstart_shared::errors::DevstartResult;

#[async_trait]
pub trait HostNetControl: Send + Sync {
    /// Whether any virtual switch name starts with `prefix`.
    async fn switch_exists(&self, prefix: &str) -> DevstartResult<bool>;

    /// Create a host-only switch tagged with `notes`.
    async fn create_internal_switch(&self, name: &str, notes: &str) -> DevstartResult<()>;

    async fn remove_switch(&self, name: &str) -> DevstartResult<()>;

    /// Raw host interface configuration dump (addresses of every adapter).
    async fn interface_config(&self) -> DevstartResult<String>;

    /// Add `address/netmask` to the host adapter backing `switch`.
    async fn add_address(&self, switch: &str, address: &str, netmask: &str) -> DevstartResult<()>;
}
