//! Per-format track backends.
//!
//! Every format tag is owned by one [`TrackBackend`]. The registry never
//! names a concrete backend type: it looks up a [`BackendFactory`] in the
//! [`BackendRegistry`] built at process setup and constructs the backend the
//! first time a track of that format arrives.

mod indexed;

pub use indexed::IndexedTrackManager;

use crate::Result;
use crate::storage::{LocationStorage, TrackStream};
use crate::types::FormatTag;
use async_trait::async_trait;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;

/// Capability set every format backend provides
#[async_trait]
pub trait TrackBackend: Send + Sync {
    fn format(&self) -> FormatTag;

    /// Route prefix without the leading slash, e.g. `tracks.bigwig`
    fn prefix(&self) -> &str;

    /// Register a track by location
    async fn add_uri(&self, location: &str, key: &str) -> Result<()>;

    /// Register a track from a stream positioned at offset 0
    async fn add(&self, key: &str, stream: &mut dyn TrackStream, location: &str) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;

    /// Rename a track; `false` if `key1` is unknown
    async fn move_track(&self, key1: &str, key2: &str) -> bool;

    async fn list(&self) -> Vec<String>;

    async fn get(&self, key: &str) -> Option<String>;

    /// Install this backend's routes under `/{prefix}`
    fn serve_to(self: Arc<Self>, router: Router) -> Router;
}

/// Builds a backend given its route prefix and tag
pub type BackendFactory = Arc<dyn Fn(&str, FormatTag) -> Arc<dyn TrackBackend> + Send + Sync>;

/// Format tag to backend constructor mapping
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<FormatTag, BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// [`IndexedTrackManager`] for every supported format.
    pub fn with_defaults(storage: Arc<dyn LocationStorage>, max_payload: usize) -> Self {
        let mut registry = Self::new();
        for tag in FormatTag::SUPPORTED {
            let storage = storage.clone();
            registry.register(tag, move |prefix, format| {
                let backend: Arc<dyn TrackBackend> = Arc::new(IndexedTrackManager::new(
                    prefix,
                    format,
                    storage.clone(),
                    max_payload,
                ));
                backend
            });
        }
        registry
    }

    /// Add or replace the constructor for `tag`. The sentinel tag is ignored.
    pub fn register<F>(&mut self, tag: FormatTag, factory: F) -> &mut Self
    where
        F: Fn(&str, FormatTag) -> Arc<dyn TrackBackend> + Send + Sync + 'static,
    {
        if tag.is_supported() {
            self.factories.insert(tag, Arc::new(factory));
        }
        self
    }

    pub fn contains(&self, tag: FormatTag) -> bool {
        self.factories.contains_key(&tag)
    }

    /// Registered tags in [`FormatTag::SUPPORTED`] order.
    pub fn formats(&self) -> Vec<FormatTag> {
        FormatTag::SUPPORTED
            .into_iter()
            .filter(|tag| self.contains(*tag))
            .collect()
    }

    /// Construct the backend for `tag` inside namespace `namespace`.
    pub fn build(&self, namespace: &str, tag: FormatTag) -> Option<Arc<dyn TrackBackend>> {
        let factory = self.factories.get(&tag)?;
        let prefix = format!("{}.{}", namespace, tag);
        Some(factory(&prefix, tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;

    fn storage() -> Arc<dyn LocationStorage> {
        Arc::new(LocalStorage::new(None))
    }

    #[test]
    fn test_defaults_cover_supported_formats() {
        let registry = BackendRegistry::with_defaults(storage(), 1024);
        assert_eq!(registry.formats(), FormatTag::SUPPORTED.to_vec());
        assert!(!registry.contains(FormatTag::Unsupported));
    }

    #[test]
    fn test_build_sets_prefix_and_format() {
        let registry = BackendRegistry::with_defaults(storage(), 1024);
        let backend = registry.build("tracks", FormatTag::BigBedLarge).unwrap();
        assert_eq!(backend.prefix(), "tracks.bigbedLarge");
        assert_eq!(backend.format(), FormatTag::BigBedLarge);
        assert!(registry.build("tracks", FormatTag::Unsupported).is_none());
    }

    #[test]
    fn test_register_unsupported_is_ignored() {
        let mut registry = BackendRegistry::new();
        let storage = storage();
        registry.register(FormatTag::Unsupported, move |prefix, format| {
            let backend: Arc<dyn TrackBackend> =
                Arc::new(IndexedTrackManager::new(prefix, format, storage.clone(), 16));
            backend
        });
        assert!(registry.formats().is_empty());
    }
}
