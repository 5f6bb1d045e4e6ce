use super::{ByteRange, LocationStorage};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Largest single range read served from disk
const MAX_RANGE_READ: u64 = 10 * 1024 * 1024;

pub struct LocalStorage {
    root: Option<PathBuf>,
}

impl LocalStorage {
    /// `root` anchors relative locations; absolute paths are used as-is.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location.strip_prefix("file://").unwrap_or(location));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl LocationStorage for LocalStorage {
    async fn exists(&self, location: &str) -> bool {
        fs::metadata(self.resolve(location))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn size(&self, location: &str) -> Result<u64> {
        let metadata = fs::metadata(self.resolve(location))
            .await
            .map_err(|_| Error::NotFound(location.to_string()))?;
        Ok(metadata.len())
    }

    async fn read_bytes(&self, location: &str, range: Option<ByteRange>) -> Result<Bytes> {
        let path = self.resolve(location);
        let mut file = fs::File::open(&path)
            .await
            .map_err(|_| Error::NotFound(location.to_string()))?;

        let bytes = match range {
            Some(r) => {
                let len = match r.end {
                    Some(end) if end <= r.start => {
                        return Err(Error::InvalidRange(format!("{}-{}", r.start, end)));
                    }
                    Some(end) => end - r.start,
                    None => u64::MAX,
                };
                file.seek(std::io::SeekFrom::Start(r.start)).await?;
                let mut buf = Vec::new();
                file.take(len.min(MAX_RANGE_READ))
                    .read_to_end(&mut buf)
                    .await?;
                Bytes::from(buf)
            }
            None => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf).await?;
                Bytes::from(buf)
            }
        };

        Ok(bytes)
    }

    fn local_path(&self, location: &str) -> Option<PathBuf> {
        Some(self.resolve(location))
    }
}
