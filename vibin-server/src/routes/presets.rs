use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use vibin_core::model::Preset;
use vibin_core::VibinError;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/presets", get(list))
        .route("/presets/{id}", get(get_one))
        .route("/presets/{id}/play", get(play).post(play))
}

async fn list(State(state): State<AppState>) -> Json<vibin_core::model::Presets> {
    Json(state.hub.presets())
}

async fn get_one(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Preset>> {
    state
        .hub
        .presets()
        .presets
        .into_iter()
        .find(|p| p.id == Some(id))
        .map(Json)
        .ok_or_else(|| VibinError::NotFound(format!("no preset with id {id}")).into())
}

async fn play(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<()> {
    state.hub.streamer().commands().play_preset(id).await?;
    Ok(())
}
