//! HTTP handlers for the shared namespace.
//!
//! - `GET /{ns}/ls` - key → location
//! - `GET /{ns}/list` - `[{id, format}]`
//! - `GET /{ns}/{id}/{*cmd}` - 307 to `/{ns}.{format}/{id}/{cmd}`

use super::TrackRegistry;
use crate::types::FormatTag;
use crate::{Error, Result};
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{Uri, header},
    response::{IntoResponse, Redirect, Response},
    routing::{any, get},
};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower::ServiceExt;

const CORS_ANY: (header::HeaderName, &str) = (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");

/// Characters that cannot appear literally inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub(super) fn namespace_routes(registry: Arc<TrackRegistry>) -> Router {
    let prefix = format!("/{}", registry.id());
    Router::new()
        .route(&format!("{}/ls", prefix), get(ls))
        .route(&format!("{}/list", prefix), get(list))
        .route(&format!("{}/{{id}}/{{*cmd}}", prefix), get(redirect))
        .with_state(registry)
}

/// Catch-all for a format whose backend is constructed after routing was set up.
pub(super) fn deferred_routes(registry: Arc<TrackRegistry>, format: FormatTag) -> Router {
    let path = format!("/{}.{}/{{*rest}}", registry.id(), format);
    // Backends are never replaced once built, so their router is built once.
    let cached: Arc<OnceCell<Router>> = Arc::new(OnceCell::new());
    Router::new()
        .route(
            &path,
            any(
                move |State(registry): State<Arc<TrackRegistry>>, request: Request| {
                    let cached = cached.clone();
                    async move { forward(registry, format, &cached, request).await }
                },
            ),
        )
        .with_state(registry)
}

async fn ls(State(registry): State<Arc<TrackRegistry>>) -> impl IntoResponse {
    ([CORS_ANY], Json(registry.locations().await))
}

async fn list(State(registry): State<Arc<TrackRegistry>>) -> impl IntoResponse {
    ([CORS_ANY], Json(registry.entries().await))
}

async fn redirect(
    State(registry): State<Arc<TrackRegistry>>,
    Path((id, cmd)): Path<(String, String)>,
    uri: Uri,
) -> Result<Response> {
    let format = registry
        .format_of(&id)
        .await
        .ok_or_else(|| Error::NotFound(id.clone()))?;

    let mut target = target_path(&format!("{}.{}", registry.id(), format), &id, &cmd);
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }
    tracing::debug!(id = %id, target = %target, "redirecting");
    Ok(([CORS_ANY], Redirect::temporary(&target)).into_response())
}

/// Re-encodes the decoded `id` and each `cmd` segment for the backend path.
fn target_path(prefix: &str, id: &str, cmd: &str) -> String {
    let mut path = format!("/{}/{}", prefix, utf8_percent_encode(id, SEGMENT));
    for segment in cmd.split('/') {
        path.push('/');
        path.extend(utf8_percent_encode(segment, SEGMENT));
    }
    path
}

async fn forward(
    registry: Arc<TrackRegistry>,
    format: FormatTag,
    cached: &OnceCell<Router>,
    request: Request,
) -> Response {
    let router = match cached.get() {
        Some(router) => router.clone(),
        None => {
            let Some(backend) = registry.backend(format).await else {
                return Error::NotFound(format!("no {} tracks registered", format))
                    .into_response();
            };
            cached
                .get_or_init(|| async move { backend.serve_to(Router::new()) })
                .await
                .clone()
        }
    };
    match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}
