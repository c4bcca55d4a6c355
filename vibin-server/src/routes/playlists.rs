use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vibin_core::model::StoredPlaylist;
use vibin_core::VibinError;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/playlists", get(list).put(update_active))
        .route("/playlists/{id}", get(get_one).put(rename).delete(delete_one))
        .route("/playlists/{id}/make_current", post(make_current))
        .route("/playlists/current/store", post(store_current))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<vibin_core::model::StoredPlaylists>> {
    Ok(Json(state.hub.stored_playlists()?))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<StoredPlaylist>> {
    let playlists = state.hub.stored_playlists()?;
    playlists
        .playlists
        .into_iter()
        .find(|p| p.id == id)
        .map(Json)
        .ok_or_else(|| VibinError::NotFound(format!("no stored playlist with id '{id}'")).into())
}

#[derive(Debug, Deserialize)]
struct RenameBody {
    name: String,
}

async fn rename(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<RenameBody>) -> ApiResult<Json<StoredPlaylist>> {
    Ok(Json(state.hub.playlists().update_metadata(&id, &body.name)?))
}

async fn update_active(State(_state): State<AppState>) -> ApiResult<()> {
    Err(VibinError::InputError("PUT /playlists requires a playlist id; use PUT /playlists/{id}".to_string()).into())
}

async fn delete_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.hub.playlists().delete(&id)?;
    Ok(())
}

async fn make_current(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.hub.playlists().activate(&id, &state.hub.settings().all_albums_path).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct StoreCurrentQuery {
    name: String,
    #[serde(default)]
    replace: bool,
}

async fn store_current(State(state): State<AppState>, Query(query): Query<StoreCurrentQuery>) -> ApiResult<Json<StoredPlaylist>> {
    Ok(Json(state.hub.playlists().store_active_as_playlist(&query.name, query.replace)?))
}
