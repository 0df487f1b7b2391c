// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::http_snapshot_source::HttpSnapshotSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{health_check, list_views, stream_view};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings().context("failed to load config/studio")?;

    // Create snapshot source (infrastructure layer)
    let source = Arc::new(
        HttpSnapshotSource::new(settings.server.base_url.clone(), settings.server.request_timeout())
            .context("failed to build HTTP client")?,
    );

    // Create services (application layer)
    let dashboard_service = DashboardService::new(source, settings.polling.clone(), settings.views.clone());

    let state = Arc::new(AppState { dashboard_service });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/views", get(list_views))
        .route("/views/:id/feed", get(stream_view))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = settings
        .listen
        .addr
        .parse()
        .with_context(|| format!("invalid listen address {}", settings.listen.addr))?;
    tracing::info!(
        %addr,
        upstream = %settings.server.base_url,
        views = settings.views.len(),
        interval_ms = settings.polling.interval_ms,
        "starting studio-meters"
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
