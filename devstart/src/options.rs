//! Runtime configuration.
//!
//! Defaults are built in; `<home>/config.json` may override any field except
//! the home directory itself, which comes from `DEVSTART_HOME` or falls back to
//! `~/.devstart`.

use crate::constants::{network, session};
use crate::layout::FilesystemLayout;
use crate::resource::Catalog;
use devstart_shared::errors::{DevstartError, DevstartResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "DEVSTART_HOME";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevstartOptions {
    #[serde(skip)]
    pub home_dir: PathBuf,
    pub director_ip: String,
    pub router_ip: String,
    pub host_ip: String,
    pub vm_name: String,
    pub switch_name: String,
    /// Artifacts the cache stages before the state is written.
    pub dependencies: Catalog,
}

impl Default for DevstartOptions {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
            director_ip: network::DIRECTOR_IP.to_string(),
            router_ip: network::ROUTER_IP.to_string(),
            host_ip: network::HOST_IP.to_string(),
            vm_name: session::VM_NAME.to_string(),
            switch_name: session::SWITCH_NAME.to_string(),
            dependencies: Catalog::default(),
        }
    }
}

fn default_home_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".devstart")
}

impl DevstartOptions {
    /// Defaults overlaid with `<home>/config.json` when present.
    pub fn load() -> DevstartResult<Self> {
        Self::load_from(default_home_dir())
    }

    pub fn load_from(home_dir: PathBuf) -> DevstartResult<Self> {
        if !home_dir.is_absolute() {
            return Err(DevstartError::Config(format!(
                "home_dir must be absolute path, got: {}",
                home_dir.display()
            )));
        }

        let config_path = FilesystemLayout::new(home_dir.clone()).config_path();
        let mut options = if config_path.exists() {
            Self::read_file(&config_path)?
        } else {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            Self::default()
        };
        options.home_dir = home_dir;
        Ok(options)
    }

    fn read_file(path: &Path) -> DevstartResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DevstartError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            DevstartError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn layout(&self) -> FilesystemLayout {
        FilesystemLayout::new(self.home_dir.clone())
    }

    /// The fixed pair of addresses aliased on the session switch.
    pub fn alias_addresses(&self) -> Vec<String> {
        vec![self.director_ip.clone(), self.router_ip.clone()]
    }

    /// Addresses the VM always reaches without the host proxy.
    pub fn proxy_exclusions(&self) -> Vec<String> {
        vec![
            self.director_ip.clone(),
            self.router_ip.clone(),
            self.host_ip.clone(),
        ]
    }
}
