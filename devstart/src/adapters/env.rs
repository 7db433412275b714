//! Filesystem environment: home layout and dependency archive unpacking.

use crate::layout::FilesystemLayout;
use crate::ports::Env;
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use flate2::read::GzDecoder;
use std::path::Path;
use tar::Archive;

pub struct FsEnv {
    layout: FilesystemLayout,
}

impl FsEnv {
    pub fn new(layout: FilesystemLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl Env for FsEnv {
    async fn create_dirs(&self) -> DevstartResult<()> {
        let layout = self.layout.clone();
        tokio::task::spawn_blocking(move || layout.prepare())
            .await
            .map_err(|e| DevstartError::Internal(format!("directory setup task failed: {e}")))?
    }

    /// Replace the state directory with the archive's contents.
    async fn setup_state(&self, deps_path: &Path) -> DevstartResult<()> {
        let archive = deps_path.to_path_buf();
        let state_dir = self.layout.state_dir();

        tokio::task::spawn_blocking(move || reset_and_unpack(&archive, &state_dir))
            .await
            .map_err(|e| DevstartError::Internal(format!("extraction task failed: {e}")))?
    }
}

fn reset_and_unpack(archive_path: &Path, state_dir: &Path) -> DevstartResult<()> {
    if state_dir.exists() {
        std::fs::remove_dir_all(state_dir).map_err(|e| {
            DevstartError::Storage(format!(
                "failed to clear {}: {}",
                state_dir.display(),
                e
            ))
        })?;
    }
    std::fs::create_dir_all(state_dir)?;

    let file = std::fs::File::open(archive_path).map_err(|e| {
        DevstartError::Storage(format!(
            "failed to open {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    let mut archive = Archive::new(GzDecoder::new(file));
    archive.unpack(state_dir).map_err(|e| {
        DevstartError::Storage(format!(
            "failed to extract {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    tracing::info!(
        archive = %archive_path.display(),
        state_dir = %state_dir.display(),
        "Dependency archive unpacked"
    );
    Ok(())
}
