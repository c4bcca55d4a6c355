use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vibin_core::model::{Favorite, FavoriteType};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_all).post(add))
        .route("/favorites/albums", get(list_albums))
        .route("/favorites/tracks", get(list_tracks))
        .route("/favorites/{media_id}", delete(remove))
}

async fn list_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Favorite>>> {
    Ok(Json(state.hub.favorites(None).await?))
}

async fn list_albums(State(state): State<AppState>) -> ApiResult<Json<Vec<Favorite>>> {
    Ok(Json(state.hub.favorites(Some(FavoriteType::Album)).await?))
}

async fn list_tracks(State(state): State<AppState>) -> ApiResult<Json<Vec<Favorite>>> {
    Ok(Json(state.hub.favorites(Some(FavoriteType::Track)).await?))
}

#[derive(Debug, Deserialize)]
struct AddFavoriteBody {
    #[serde(rename = "type")]
    kind: FavoriteType,
    #[serde(rename = "mediaId")]
    media_id: String,
}

async fn add(State(state): State<AppState>, Json(body): Json<AddFavoriteBody>) -> ApiResult<()> {
    state.hub.add_favorite(body.kind, &body.media_id).await?;
    Ok(())
}

async fn remove(State(state): State<AppState>, Path(media_id): Path<String>) -> ApiResult<()> {
    state.hub.remove_favorite(&media_id).await?;
    Ok(())
}
