//! HTTP proxy settings handed to the VM's network forwarder.

use devstart_shared::errors::{DevstartError, DevstartResult};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https: Option<String>,
    /// Comma-separated hosts and addresses that bypass the proxy.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exclude: String,
}

impl ProxyConfig {
    /// Build from the host's proxy variables, always excluding `local_ips`.
    pub fn from_env(local_ips: &[&str]) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), local_ips)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, local_ips: &[&str]) -> Self {
        let var = |upper: &str, lower: &str| {
            lookup(upper)
                .or_else(|| lookup(lower))
                .filter(|value| !value.is_empty())
        };

        let mut exclude: Vec<String> = var("NO_PROXY", "no_proxy")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        for ip in local_ips {
            if !exclude.iter().any(|entry| entry == ip) {
                exclude.push(ip.to_string());
            }
        }

        Self {
            http: var("HTTP_PROXY", "http_proxy"),
            https: var("HTTPS_PROXY", "https_proxy"),
            exclude: exclude.join(","),
        }
    }
}

/// Write `config` as JSON to `path`, readable by the owner only.
pub fn write_http_config(path: &Path, config: &ProxyConfig) -> DevstartResult<()> {
    let contents = serde_json::to_vec(config)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        DevstartError::Storage(format!(
            "Failed to open proxy config {}: {}",
            path.display(),
            e
        ))
    })?;
    file.write_all(&contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::debug!(path = %path.display(), "Wrote proxy config");
    Ok(())
}
