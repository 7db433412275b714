//! Dependency archive metadata, shipped inside the archive as `metadata.json`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Compatibility tag; must equal the supported version exactly.
    #[serde(rename = "compatibility_version", default)]
    pub version: String,
    #[serde(default)]
    pub deployment_name: String,
    #[serde(default)]
    pub artifact_version: String,
    /// Text shown when asking for analytics consent.
    #[serde(default)]
    pub analytics_message: String,
    /// Base VM memory in MB; 0 keeps the built-in default.
    #[serde(default)]
    pub default_memory: u64,
    #[serde(default)]
    pub services: Vec<Service>,
}

/// A deployable service the archive knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    /// Token accepted by the `--services` selector.
    #[serde(rename = "flag_name")]
    pub flagname: String,
    #[serde(default)]
    pub default_deploy: bool,
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub script: String,
}
