//! Track format detection.
//!
//! The registry never decides a track's format itself; it asks a
//! [`FormatOracle`]. The default [`MagicOracle`] resolves a location by
//! explicit hint, then file extension, then by sniffing the leading bytes
//! through [`LocationStorage`].
//!
//! # Magic numbers
//!
//! - bigWig: `0x888FFC26`
//! - bigBed: `0x8789F2EB`
//! - Hi-C: `HIC\0`
//! - tabix image: BGZF block header (`1f 8b 08 04`)
//!
//! # Location hints
//!
//! A location may carry an explicit tag as `_format_:<tag>:<location>`, which
//! wins over anything derived from the location itself.

mod location;
mod magic;

pub use location::{from_extension, split_hint, strip_hint};
pub use magic::{MAGIC_LEN, sniff};

use crate::storage::{ByteRange, LocationStorage, TrackStream};
use crate::types::FormatTag;
use crate::{Error, Result};
use async_trait::async_trait;
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

#[async_trait]
pub trait FormatOracle: Send + Sync {
    /// Classify a track by its location string.
    async fn classify_location(&self, location: &str) -> Result<FormatTag>;

    /// Classify a track by its leading bytes. The stream is left at offset 0.
    async fn classify_stream(&self, stream: &mut dyn TrackStream) -> Result<FormatTag>;
}

pub struct MagicOracle {
    storage: Arc<dyn LocationStorage>,
}

impl MagicOracle {
    pub fn new(storage: Arc<dyn LocationStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl FormatOracle for MagicOracle {
    async fn classify_location(&self, location: &str) -> Result<FormatTag> {
        let (hint, bare) = split_hint(location);
        if let Some(tag) = hint {
            return Ok(tag);
        }
        if let Some(tag) = from_extension(bare) {
            return Ok(tag);
        }

        if !self.storage.exists(bare).await {
            return Err(Error::Classification(format!(
                "{}: unknown extension and content not readable",
                bare
            )));
        }
        let head = self
            .storage
            .read_bytes(bare, Some(ByteRange::prefix(MAGIC_LEN as u64)))
            .await
            .map_err(|e| Error::Classification(format!("{}: {}", bare, e)))?;

        sniff(&head).ok_or_else(|| Error::Classification(format!("{}: unrecognized content", bare)))
    }

    async fn classify_stream(&self, stream: &mut dyn TrackStream) -> Result<FormatTag> {
        let mut head = [0u8; MAGIC_LEN];
        let read = read_prefix(stream, &mut head).await;
        stream.seek(SeekFrom::Start(0)).await?;
        let n = read?;

        sniff(&head[..n])
            .ok_or_else(|| Error::Classification("unrecognized stream content".to_string()))
    }
}

async fn read_prefix(stream: &mut dyn TrackStream, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
