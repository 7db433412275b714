//! Dependency cache: downloads catalog items into the cache directory.
//!
//! An item already on disk is kept when it has no digest or its digest
//! matches. Downloads land in a temp file next to the target and are renamed
//! into place only after the digest checks out.

use crate::ports::Cache;
use crate::resource::{Catalog, Item};
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct HttpCache {
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl HttpCache {
    pub fn new(cache_dir: PathBuf) -> DevstartResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("devstart/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DevstartError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { cache_dir, client })
    }

    async fn is_cached(&self, item: &Item, path: &Path) -> DevstartResult<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let Some(expected) = item.sha256.as_deref() else {
            return Ok(true);
        };
        let actual = file_digest(path).await?;
        Ok(actual.eq_ignore_ascii_case(expected))
    }

    async fn download(&self, item: &Item, dest: &Path) -> DevstartResult<()> {
        tracing::info!(item = %item.name, url = %item.url, "Downloading");

        let mut response = self
            .client
            .get(&item.url)
            .send()
            .await
            .map_err(|e| DevstartError::External(format!("failed to download {}: {}", item.url, e)))?;

        if !response.status().is_success() {
            return Err(DevstartError::External(format!(
                "download failed with status {}: {}",
                response.status(),
                item.url
            )));
        }

        let mut temp = tempfile::NamedTempFile::new_in(&self.cache_dir)?;
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DevstartError::External(format!("download error: {e}")))?
        {
            hasher.update(&chunk);
            temp.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
        }
        temp.flush()?;

        if let Some(size) = item.size
            && size != downloaded
        {
            return Err(DevstartError::External(format!(
                "size mismatch for {}: expected {} bytes, got {}",
                item.name, size, downloaded
            )));
        }

        let actual = hex::encode(hasher.finalize());
        if let Some(expected) = item.sha256.as_deref()
            && !actual.eq_ignore_ascii_case(expected)
        {
            return Err(DevstartError::External(format!(
                "checksum mismatch for {}: expected {}, got {}",
                item.name, expected, actual
            )));
        }

        temp.persist(dest).map_err(|e| {
            DevstartError::Storage(format!("failed to store {}: {}", dest.display(), e))
        })?;
        tracing::debug!(item = %item.name, bytes = downloaded, "Download complete");
        Ok(())
    }
}

#[async_trait]
impl Cache for HttpCache {
    async fn sync(&self, catalog: &Catalog) -> DevstartResult<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        for item in &catalog.items {
            let dest = self.cache_dir.join(&item.name);
            if self.is_cached(item, &dest).await? {
                tracing::debug!(item = %item.name, "Already cached");
                continue;
            }
            self.download(item, &dest).await?;
        }
        Ok(())
    }
}

async fn file_digest(path: &Path) -> DevstartResult<String> {
    let data = tokio::fs::read(path).await?;
    Ok(hex::encode(Sha256::digest(&data)))
}
