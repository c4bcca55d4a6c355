use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use vibin_core::model::MediaBrowseSingleLevel;
use vibin_core::VibinError;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/browse/children/{id}", get(children))
        .route("/browse/metadata/{id}", get(metadata))
        .route("/browse/path/{*path}", get(by_path))
}

fn media_server(state: &AppState) -> ApiResult<&vibin_core::mediaserver::MediaServerHandle> {
    state
        .hub
        .media_server()
        .ok_or_else(|| VibinError::MissingDependencyError("no media server is configured".to_string()).into())
}

async fn children(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<MediaBrowseSingleLevel>> {
    let media_server = media_server(&state)?;
    let children = media_server.children(&id).await?;
    Ok(Json(MediaBrowseSingleLevel { id, children }))
}

async fn metadata(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let media_server = media_server(&state)?;
    Ok(Json(media_server.metadata(&id).await?))
}

async fn by_path(State(state): State<AppState>, Path(path): Path<String>) -> ApiResult<Json<MediaBrowseSingleLevel>> {
    let media_server = media_server(&state)?;
    let id = media_server.resolve_path(&path).await?;
    let children = media_server.children(&id).await?;
    Ok(Json(MediaBrowseSingleLevel { id, children }))
}
