//! Host networking for the session: alias management and proxy settings.

pub mod alias;
pub mod control;
pub mod proxy;

pub use alias::{AliasWaitPolicy, NetworkAliasManager};
pub use control::HostNetControl;
pub use proxy::{ProxyConfig, write_http_config};
