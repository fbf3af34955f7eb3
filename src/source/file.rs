//! Sliced local-file source.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::StreamSource;

/// Reads a local file in `chunk_size`-byte slices.
pub struct FileSource {
    file: File,
    chunk_size: usize,
    total: u64,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let file = File::open(path).await?;
        let total = file.metadata().await?.len();
        Ok(Self {
            file,
            chunk_size,
            total,
        })
    }
}

#[async_trait]
impl StreamSource for FileSource {
    async fn next_fragment(&mut self) -> Result<Option<Bytes>> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }

    fn total_size(&self) -> Option<u64> {
        Some(self.total)
    }
}
