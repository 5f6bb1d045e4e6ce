//! Byte access to track locations.
//!
//! A track location is either a filesystem path or an `http(s)://` URL. The
//! [`LocationStorage`] trait hides the difference so the format oracle can
//! sniff leading bytes and backends can serve byte ranges regardless of where
//! the track lives.
//!
//! # Implementations
//!
//! - [`LocalStorage`] - Local filesystem paths, optionally rooted at a data directory
//! - [`HttpStorage`] - Remote URLs via HTTP range requests (`http` feature)
//! - [`RoutedStorage`] - Picks one of the above per location
//!
//! # Example
//!
//! ```no_run
//! use trackhub::storage::{LocalStorage, RoutedStorage};
//! use std::path::PathBuf;
//!
//! let storage = RoutedStorage::new(LocalStorage::new(Some(PathBuf::from("./data"))));
//! ```

#[cfg(feature = "http")]
mod http;
mod local;

#[cfg(feature = "http")]
pub use http::HttpStorage;
pub use local::LocalStorage;

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncSeek};

/// Seekable byte stream a track can be ingested from
pub trait TrackStream: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send> TrackStream for T {}

/// Byte range within a track, end-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn prefix(len: u64) -> Self {
        Self {
            start: 0,
            end: Some(len),
        }
    }
}

/// Storage backend trait for reading track content by location
#[async_trait]
pub trait LocationStorage: Send + Sync {
    /// Check if the location can be read
    async fn exists(&self, location: &str) -> bool;

    /// Total size in bytes
    async fn size(&self, location: &str) -> Result<u64>;

    /// Read bytes directly; `None` reads the whole content
    async fn read_bytes(&self, location: &str, range: Option<ByteRange>) -> Result<Bytes>;

    /// Filesystem path for the location, if it is local
    fn local_path(&self, location: &str) -> Option<PathBuf>;
}

/// Whether a location should be fetched over HTTP.
pub fn is_remote(location: &str) -> bool {
    url::Url::parse(location)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Dispatches remote locations to [`HttpStorage`] and everything else to [`LocalStorage`].
pub struct RoutedStorage {
    local: LocalStorage,
    #[cfg(feature = "http")]
    http: Option<HttpStorage>,
}

impl RoutedStorage {
    pub fn new(local: LocalStorage) -> Self {
        Self {
            local,
            #[cfg(feature = "http")]
            http: None,
        }
    }

    #[cfg(feature = "http")]
    pub fn with_http(mut self, http: HttpStorage) -> Self {
        self.http = Some(http);
        self
    }

    fn pick(&self, location: &str) -> Result<&dyn LocationStorage> {
        if !is_remote(location) {
            return Ok(&self.local);
        }
        #[cfg(feature = "http")]
        if let Some(http) = &self.http {
            return Ok(http);
        }
        Err(crate::Error::UnsupportedFormat(format!(
            "remote location without http storage: {}",
            location
        )))
    }
}

#[async_trait]
impl LocationStorage for RoutedStorage {
    async fn exists(&self, location: &str) -> bool {
        match self.pick(location) {
            Ok(storage) => storage.exists(location).await,
            Err(_) => false,
        }
    }

    async fn size(&self, location: &str) -> Result<u64> {
        self.pick(location)?.size(location).await
    }

    async fn read_bytes(&self, location: &str, range: Option<ByteRange>) -> Result<Bytes> {
        self.pick(location)?.read_bytes(location, range).await
    }

    fn local_path(&self, location: &str) -> Option<PathBuf> {
        self.pick(location).ok()?.local_path(location)
    }
}
