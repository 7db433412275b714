//! Filesystem layout under the devstart home directory.
//!
//! ```text
//! <home>/
//!   config.json
//!   cache/            downloaded dependencies (devstart-deps.tgz, ...)
//!   bin/              helper binaries and the EFI boot image
//!   state/            extracted dependency archive (metadata.json, disk.vhdx)
//!     vpnkit/         proxy configuration for the VM network
//!   analytics/
//!   logs/
//! ```

use crate::constants::filenames;
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FilesystemLayout {
    home: PathBuf,
}

impl FilesystemLayout {
    pub fn new(home: PathBuf) -> Self {
        Self { home }
    }

    pub fn home_dir(&self) -> &Path {
        &self.home
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.home.join("bin")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.home.join("state")
    }

    pub fn vpnkit_state_dir(&self) -> PathBuf {
        self.state_dir().join("vpnkit")
    }

    pub fn analytics_dir(&self) -> PathBuf {
        self.home.join("analytics")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(filenames::CONFIG)
    }

    /// Default location of the dependency archive when `--file` is not given.
    pub fn deps_archive_path(&self) -> PathBuf {
        self.cache_dir().join(filenames::DEPS_ARCHIVE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.state_dir().join(filenames::METADATA)
    }

    pub fn disk_path(&self) -> PathBuf {
        self.state_dir().join(filenames::DISK)
    }

    pub fn efi_iso_path(&self) -> PathBuf {
        self.bin_dir().join(filenames::EFI_ISO)
    }

    pub fn http_proxy_path(&self) -> PathBuf {
        self.vpnkit_state_dir().join(filenames::HTTP_PROXY)
    }

    pub fn analytics_path(&self) -> PathBuf {
        self.analytics_dir().join(filenames::ANALYTICS)
    }

    pub fn provision_script_path(&self) -> PathBuf {
        self.bin_dir().join(filenames::PROVISION_SCRIPT)
    }

    /// Directories that must exist before any state is written.
    pub fn directories(&self) -> Vec<PathBuf> {
        vec![
            self.home.clone(),
            self.cache_dir(),
            self.bin_dir(),
            self.state_dir(),
            self.vpnkit_state_dir(),
            self.analytics_dir(),
            self.logs_dir(),
        ]
    }

    /// Create every layout directory.
    pub fn prepare(&self) -> DevstartResult<()> {
        for dir in self.directories() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                DevstartError::Storage(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}
