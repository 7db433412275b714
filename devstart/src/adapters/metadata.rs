use crate::metadata::Metadata;
use crate::ports::MetadataReader;
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::path::Path;

/// Reads `metadata.json` from the unpacked state directory.
pub struct JsonMetadataReader;

#[async_trait]
impl MetadataReader for JsonMetadataReader {
    async fn read(&self, path: &Path) -> DevstartResult<Metadata> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            DevstartError::Storage(format!("failed to read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
