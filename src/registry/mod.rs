//! The track registry: one namespace of keys over many format backends.
//!
//! [`TrackRegistry`] owns three maps behind a single lock:
//!
//! - key → location
//! - key → [`FormatTag`] (authoritative for routing `del`/`move`)
//! - format → [`TrackBackend`], filled lazily from a [`BackendRegistry`]
//!
//! Mutations hold the write lock across the delegated backend call, so a
//! slow backend stalls other writers. Reads (`ls`, `list`, redirects) share
//! the read lock.

mod routes;

use crate::backend::{BackendRegistry, TrackBackend};
use crate::formats::{FormatOracle, strip_hint};
use crate::manifest::Manifest;
use crate::storage::TrackStream;
use crate::types::{FormatTag, TrackEntry};
use crate::{Error, Result};
use axum::Router;
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncSeekExt;
use tokio::sync::RwLock;

#[derive(Default)]
struct RegistryState {
    locations: HashMap<String, String>,
    formats: HashMap<String, FormatTag>,
    backends: HashMap<FormatTag, Arc<dyn TrackBackend>>,
}

/// Outcome of loading a manifest
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    /// `(key, error message)` for each skipped entry
    pub failed: Vec<(String, String)>,
}

pub struct TrackRegistry {
    id: String,
    oracle: Arc<dyn FormatOracle>,
    factories: Arc<BackendRegistry>,
    state: RwLock<RegistryState>,
}

impl TrackRegistry {
    pub fn new(
        id: impl Into<String>,
        oracle: Arc<dyn FormatOracle>,
        factories: Arc<BackendRegistry>,
    ) -> Self {
        Self {
            id: id.into(),
            oracle,
            factories,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Build a registry and register every entry of the manifest at `path`.
    pub async fn from_manifest(
        id: impl Into<String>,
        path: &Path,
        oracle: Arc<dyn FormatOracle>,
        factories: Arc<BackendRegistry>,
    ) -> Result<Self> {
        let registry = Self::new(id, oracle, factories);
        let manifest = Manifest::load(path).await?;
        registry.bulk_load(&manifest).await;
        Ok(registry)
    }

    /// Namespace this registry is mounted under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register entries in manifest order. Later duplicates overwrite earlier
    /// ones; failing entries are skipped.
    pub async fn bulk_load(&self, manifest: &Manifest) -> LoadReport {
        let mut report = LoadReport::default();
        for (key, location) in manifest.entries() {
            match self.add_uri(location, key).await {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    tracing::warn!(key = %key, location = %location, "skipping track: {}", e);
                    report.failed.push((key.clone(), e.to_string()));
                }
            }
        }
        tracing::info!(
            namespace = %self.id,
            loaded = report.loaded,
            failed = report.failed.len(),
            "manifest loaded"
        );
        report
    }

    /// Register a track by location. Nothing is recorded unless the format is
    /// recognized, has a backend, and the backend accepts the track.
    pub async fn add_uri(&self, location: &str, key: &str) -> Result<()> {
        let format = self.oracle.classify_location(location).await?;
        let location = strip_hint(location);

        let mut state = self.state.write().await;
        let (backend, created) = self.backend_for(&state, format, location)?;
        backend
            .add_uri(location, key)
            .await
            .map_err(|e| Error::delegation(key, format, e))?;

        self.commit(&mut state, key, location, format, backend, created)
            .await;
        Ok(())
    }

    /// Register a track from a seekable stream. Only formats that can be
    /// ingested from raw bytes are accepted.
    pub async fn add(&self, key: &str, stream: &mut dyn TrackStream, location: &str) -> Result<()> {
        let format = self.oracle.classify_stream(stream).await?;
        if !format.is_stream_ingestible() {
            return Err(Error::UnsupportedFormat(format!(
                "{} tracks cannot be added from a stream",
                format
            )));
        }
        stream.seek(SeekFrom::Start(0)).await?;

        let mut state = self.state.write().await;
        let (backend, created) = self.backend_for(&state, format, location)?;
        backend
            .add(key, stream, location)
            .await
            .map_err(|e| Error::delegation(key, format, e))?;

        self.commit(&mut state, key, location, format, backend, created)
            .await;
        Ok(())
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let format = state
            .formats
            .get(key)
            .copied()
            .ok_or_else(|| Error::NotFound(key.to_string()))?;

        let backend = match state.backends.get(&format) {
            Some(backend) => backend.clone(),
            None => {
                tracing::error!(key = %key, format = %format, "track has no backend");
                return Err(Error::InvariantViolation(format!(
                    "track {} is tagged {} but no {} backend exists",
                    key, format, format
                )));
            }
        };
        backend
            .del(key)
            .await
            .map_err(|e| Error::delegation(key, format, e))?;

        state.locations.remove(key);
        state.formats.remove(key);
        tracing::debug!(key = %key, format = %format, "track deleted");
        Ok(())
    }

    /// Rename `key1` to `key2`. Returns `false` without changes if `key1` is
    /// unknown or `key2` is taken.
    pub async fn move_track(&self, key1: &str, key2: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(format) = state.formats.get(key1).copied() else {
            return false;
        };
        if key1 == key2 {
            return true;
        }
        if state.formats.contains_key(key2) {
            tracing::warn!(from = %key1, to = %key2, "move target already registered");
            return false;
        }
        let Some(backend) = state.backends.get(&format).cloned() else {
            tracing::error!(key = %key1, format = %format, "track has no backend");
            return false;
        };
        if !backend.move_track(key1, key2).await {
            tracing::warn!(from = %key1, to = %key2, format = %format, "backend refused move");
            return false;
        }

        if let Some(location) = state.locations.remove(key1) {
            state.locations.insert(key2.to_string(), location);
        }
        state.formats.remove(key1);
        state.formats.insert(key2.to_string(), format);
        tracing::debug!(from = %key1, to = %key2, format = %format, "track moved");
        true
    }

    /// All registered keys, in no particular order.
    pub async fn list(&self) -> Vec<String> {
        self.state.read().await.locations.keys().cloned().collect()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.state.read().await.locations.get(key).cloned()
    }

    pub async fn format_of(&self, key: &str) -> Option<FormatTag> {
        self.state.read().await.formats.get(key).copied()
    }

    /// Snapshot of key → location.
    pub async fn locations(&self) -> HashMap<String, String> {
        self.state.read().await.locations.clone()
    }

    pub async fn entries(&self) -> Vec<TrackEntry> {
        let state = self.state.read().await;
        state
            .locations
            .keys()
            .map(|key| TrackEntry {
                id: key.clone(),
                format: state.formats.get(key).copied().unwrap_or_default(),
            })
            .collect()
    }

    /// Backend already constructed for `format`, if any.
    pub async fn backend(&self, format: FormatTag) -> Option<Arc<dyn TrackBackend>> {
        self.state.read().await.backends.get(&format).cloned()
    }

    /// Install the namespace routes, then every format's routes.
    ///
    /// Formats whose backend does not exist yet get a forwarder that binds
    /// to the backend once a track of that format is registered.
    pub async fn serve_to(self: Arc<Self>, router: Router) -> Router {
        let mut router = router.merge(routes::namespace_routes(self.clone()));
        let backends = self.state.read().await.backends.clone();

        for format in self.factories.formats() {
            router = match backends.get(&format) {
                Some(backend) => backend.clone().serve_to(router),
                None => router.merge(routes::deferred_routes(self.clone(), format)),
            };
        }
        router
    }

    fn backend_for(
        &self,
        state: &RegistryState,
        format: FormatTag,
        location: &str,
    ) -> Result<(Arc<dyn TrackBackend>, bool)> {
        if let Some(backend) = state.backends.get(&format) {
            return Ok((backend.clone(), false));
        }
        let backend = self.factories.build(&self.id, format).ok_or_else(|| {
            Error::UnsupportedFormat(format!("no backend for {} ({})", format, location))
        })?;
        Ok((backend, true))
    }

    async fn commit(
        &self,
        state: &mut RegistryState,
        key: &str,
        location: &str,
        format: FormatTag,
        backend: Arc<dyn TrackBackend>,
        created: bool,
    ) {
        if created {
            tracing::info!(namespace = %self.id, format = %format, "backend constructed");
            state.backends.insert(format, backend);
        }

        if let Some(previous) = state.formats.insert(key.to_string(), format) {
            if previous != format {
                if let Some(old) = state.backends.get(&previous) {
                    if let Err(e) = old.del(key).await {
                        tracing::warn!(key = %key, format = %previous, "stale track not removed: {}", e);
                    }
                }
            }
        }
        state.locations.insert(key.to_string(), location.to_string());
        tracing::debug!(key = %key, format = %format, location = %location, "track registered");
    }
}
