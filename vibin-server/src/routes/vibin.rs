//! `/vibin/...`: server-introspection endpoints (status, settings, the raw
//! config-store dump used for diagnostics, and media-cache invalidation).

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use vibin_core::model::{VibinSettings, VibinStatus};
use vibin_core::VibinError;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vibin/status", get(status))
        .route("/vibin/settings", get(settings))
        .route("/vibin/db", get(db))
        .route("/vibin/clear_media_caches", post(clear_media_caches))
}

async fn status(State(state): State<AppState>) -> Json<VibinStatus> {
    Json(VibinStatus {
        vibin_version: env!("CARGO_PKG_VERSION").to_string(),
        start_time: state.start_time,
        system_node: hostname(),
        system_platform: std::env::consts::OS.to_string(),
        system_version: std::env::consts::ARCH.to_string(),
        clients: state.clients.lock().clone(),
    })
}

async fn settings(State(state): State<AppState>) -> Json<VibinSettings> {
    Json(state.hub.settings().clone())
}

async fn db(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.hub.store().dump())
}

async fn clear_media_caches(State(state): State<AppState>) -> ApiResult<()> {
    let media_server = state
        .hub
        .media_server()
        .ok_or_else(|| VibinError::MissingDependencyError("no media server is configured".to_string()))?;
    media_server.clear_caches();
    Ok(())
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}
