use super::TrackBackend;
use crate::storage::{ByteRange, LocationStorage, TrackStream};
use crate::types::{FormatTag, TrackInfo};
use crate::{Error, Result};
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use noodles::csi::BinningIndex;
use noodles::tabix;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
enum TrackSource {
    Location(String),
    /// Ingested from a stream; served from memory
    Buffered { location: String, data: Bytes },
}

impl TrackSource {
    fn location(&self) -> &str {
        match self {
            TrackSource::Location(location) => location,
            TrackSource::Buffered { location, .. } => location,
        }
    }
}

/// Backend that indexes tracks of one format by location and serves
/// their metadata and raw bytes under `/{prefix}`.
pub struct IndexedTrackManager {
    prefix: String,
    format: FormatTag,
    storage: Arc<dyn LocationStorage>,
    max_payload: usize,
    tracks: RwLock<HashMap<String, TrackSource>>,
}

impl IndexedTrackManager {
    pub fn new(
        prefix: &str,
        format: FormatTag,
        storage: Arc<dyn LocationStorage>,
        max_payload: usize,
    ) -> Self {
        Self {
            prefix: prefix.to_string(),
            format,
            storage,
            max_payload,
            tracks: RwLock::new(HashMap::new()),
        }
    }

    async fn source(&self, key: &str) -> Result<TrackSource> {
        self.tracks
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn info(&self, key: &str) -> Result<TrackInfo> {
        let source = self.source(key).await?;
        let (size, buffered) = match &source {
            TrackSource::Buffered { data, .. } => (Some(data.len() as u64), true),
            TrackSource::Location(location) => (self.storage.size(location).await.ok(), false),
        };

        let references = match (&source, self.format) {
            (TrackSource::Location(location), FormatTag::Image) => {
                match self.storage.local_path(location) {
                    Some(path) => tabix_references(path).await,
                    None => None,
                }
            }
            _ => None,
        };

        Ok(TrackInfo {
            id: key.to_string(),
            format: self.format,
            location: source.location().to_string(),
            size,
            buffered,
            references,
        })
    }

    /// Returns the bytes and the total content length.
    async fn read(&self, key: &str, range: Option<ByteRange>) -> Result<(Bytes, u64)> {
        match self.source(key).await? {
            TrackSource::Buffered { data, .. } => {
                let total = data.len() as u64;
                let Some(r) = range else {
                    return Ok((data, total));
                };
                let end = r.end.unwrap_or(total).min(total);
                if r.start >= end {
                    return Err(Error::InvalidRange(format!("{}-{}", r.start, end)));
                }
                Ok((data.slice(r.start as usize..end as usize), total))
            }
            TrackSource::Location(location) => {
                let bytes = self.storage.read_bytes(&location, range).await?;
                let total = match range {
                    Some(_) => self.storage.size(&location).await?,
                    None => bytes.len() as u64,
                };
                Ok((bytes, total))
            }
        }
    }
}

/// Reference names from the `.tbi` next to a local image track.
async fn tabix_references(path: PathBuf) -> Option<Vec<String>> {
    let index_path = PathBuf::from(format!("{}.tbi", path.display()));
    if !index_path.exists() {
        return None;
    }

    let index = match tabix::r#async::read(&index_path).await {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!(path = %index_path.display(), "failed to read tabix index: {}", e);
            return None;
        }
    };

    let header = index.header()?;
    Some(header.reference_sequence_names().iter().cloned().collect())
}

#[async_trait]
impl TrackBackend for IndexedTrackManager {
    fn format(&self) -> FormatTag {
        self.format
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn add_uri(&self, location: &str, key: &str) -> Result<()> {
        self.tracks
            .write()
            .await
            .insert(key.to_string(), TrackSource::Location(location.to_string()));
        Ok(())
    }

    async fn add(&self, key: &str, stream: &mut dyn TrackStream, location: &str) -> Result<()> {
        let mut buf = Vec::new();
        (&mut *stream)
            .take(self.max_payload as u64 + 1)
            .read_to_end(&mut buf)
            .await?;
        if buf.len() > self.max_payload {
            return Err(Error::PayloadTooLarge);
        }

        self.tracks.write().await.insert(
            key.to_string(),
            TrackSource::Buffered {
                location: location.to_string(),
                data: Bytes::from(buf),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        match self.tracks.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    async fn move_track(&self, key1: &str, key2: &str) -> bool {
        let mut tracks = self.tracks.write().await;
        match tracks.remove(key1) {
            Some(source) => {
                tracks.insert(key2.to_string(), source);
                true
            }
            None => false,
        }
    }

    async fn list(&self) -> Vec<String> {
        self.tracks.read().await.keys().cloned().collect()
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.tracks
            .read()
            .await
            .get(key)
            .map(|source| source.location().to_string())
    }

    fn serve_to(self: Arc<Self>, router: Router) -> Router {
        let prefix = format!("/{}", self.prefix);
        let routes = Router::new()
            .route(&format!("{}/ls", prefix), get(ls))
            .route(&format!("{}/list", prefix), get(list))
            .route(&format!("{}/{{id}}/{{*cmd}}", prefix), get(command))
            .with_state(self);
        router.merge(routes)
    }
}

const CORS_ANY: (header::HeaderName, &str) = (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");

async fn ls(State(manager): State<Arc<IndexedTrackManager>>) -> impl IntoResponse {
    let locations: HashMap<String, String> = manager
        .tracks
        .read()
        .await
        .iter()
        .map(|(key, source)| (key.clone(), source.location().to_string()))
        .collect();
    ([CORS_ANY], Json(locations))
}

async fn list(State(manager): State<Arc<IndexedTrackManager>>) -> impl IntoResponse {
    ([CORS_ANY], Json(manager.list().await))
}

#[derive(Debug, Deserialize)]
struct BytesQuery {
    start: Option<u64>,
    end: Option<u64>,
}

async fn command(
    State(manager): State<Arc<IndexedTrackManager>>,
    Path((id, cmd)): Path<(String, String)>,
    Query(query): Query<BytesQuery>,
) -> Result<Response> {
    match cmd.trim_end_matches('/') {
        "info" => Ok(([CORS_ANY], Json(manager.info(&id).await?)).into_response()),
        "bytes" => serve_bytes(&manager, &id, query).await,
        other => {
            // Surface an unknown track before an unknown command.
            manager.source(&id).await?;
            Err(Error::NotFound(format!("unknown command: {}", other)))
        }
    }
}

async fn serve_bytes(
    manager: &IndexedTrackManager,
    id: &str,
    query: BytesQuery,
) -> Result<Response> {
    let range = match (query.start, query.end) {
        (Some(start), end) => Some(ByteRange { start, end }),
        (None, Some(end)) => Some(ByteRange::prefix(end)),
        (None, None) => None,
    };

    let (bytes, total) = manager.read(id, range).await?;
    let content_type = manager.format.content_type();

    let Some(r) = range else {
        return Ok((
            StatusCode::OK,
            [
                CORS_ANY,
                (header::CONTENT_TYPE, content_type),
                (header::ACCEPT_RANGES, "bytes"),
            ],
            bytes,
        )
            .into_response());
    };

    if bytes.is_empty() {
        return Err(Error::InvalidRange(format!("start {} beyond end", r.start)));
    }
    let last = r.start + bytes.len() as u64 - 1;
    let content_range = format!("bytes {}-{}/{}", r.start, last, total);

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CONTENT_RANGE, content_range),
        ],
        bytes,
    )
        .into_response())
}
