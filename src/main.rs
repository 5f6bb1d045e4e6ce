use axum::Router;
use clap::Parser;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackhub::{
    Config, TrackRegistry,
    backend::BackendRegistry,
    formats::MagicOracle,
    manifest::Manifest,
    storage::{LocalStorage, LocationStorage, RoutedStorage},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let storage = RoutedStorage::new(LocalStorage::new(config.data_dir.clone()));
    #[cfg(feature = "http")]
    let storage = storage.with_http(trackhub::storage::HttpStorage::new()?);
    let storage: Arc<dyn LocationStorage> = Arc::new(storage);

    let registry = Arc::new(TrackRegistry::new(
        config.namespace.clone(),
        Arc::new(MagicOracle::new(storage.clone())),
        Arc::new(BackendRegistry::with_defaults(storage, config.max_payload)),
    ));

    if let Some(input) = &config.input {
        let manifest = Manifest::load(input).await?;
        registry.bulk_load(&manifest).await;
    }

    let app = registry
        .clone()
        .serve_to(Router::new())
        .await
        .layer(TraceLayer::new_for_http());

    let app = if config.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    let addr = config.bind_addr();
    tracing::info!("Starting trackhub on {}", addr);
    tracing::info!("Tracks served under /{}", registry.id());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
