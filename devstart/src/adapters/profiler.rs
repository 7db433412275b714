//! Host memory figures from `sysinfo`.

use crate::ports::MemoryProfiler;
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use sysinfo::System;

#[derive(Debug, Default)]
pub struct SysinfoProfiler;

impl SysinfoProfiler {
    async fn read(field: fn(&System) -> u64, what: &'static str) -> DevstartResult<u64> {
        let bytes = tokio::task::spawn_blocking(move || {
            let mut sys = System::new();
            sys.refresh_memory();
            field(&sys)
        })
        .await
        .map_err(|e| DevstartError::Internal(format!("memory probe task failed: {e}")))?;

        if bytes == 0 {
            return Err(DevstartError::External(format!("{what} memory reported as zero")));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl MemoryProfiler for SysinfoProfiler {
    async fn available_memory(&self) -> DevstartResult<u64> {
        Self::read(System::available_memory, "available").await
    }

    async fn total_memory(&self) -> DevstartResult<u64> {
        Self::read(System::total_memory, "total").await
    }
}
