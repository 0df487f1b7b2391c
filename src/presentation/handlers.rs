// HTTP request handlers
use crate::application::dashboard_service::DashboardError;
use crate::infrastructure::config::ViewConfig;
use crate::infrastructure::feed_stream::feed_response;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct FeedQuery {
    pub server: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List configured dashboard views
pub async fn list_views(State(state): State<Arc<AppState>>) -> Json<Vec<ViewConfig>> {
    Json(state.dashboard_service.views().to_vec())
}

/// Mount a view and stream its chart feed until the client disconnects
pub async fn stream_view(
    Path(id): Path<String>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    // Check if client accepts Brotli compression
    let compress = headers
        .get("accept-encoding")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.contains("br"))
        .unwrap_or(false);

    match state.dashboard_service.mount(&id, query.server) {
        Ok(rx) => feed_response(rx, compress),
        Err(e @ DashboardError::ViewNotFound(_)) => {
            tracing::debug!(error = %e, "rejecting feed request");
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}
