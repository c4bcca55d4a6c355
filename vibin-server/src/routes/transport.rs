use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use vibin_core::model::{PlaylistModifyAction, TransportState};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transport/play", post(play))
        .route("/transport/pause", post(pause))
        .route("/transport/stop", post(stop))
        .route("/transport/toggle_playback", post(toggle_playback))
        .route("/transport/next", post(next))
        .route("/transport/previous", post(previous))
        .route("/transport/repeat", post(repeat))
        .route("/transport/shuffle", post(shuffle))
        .route("/transport/seek", post(seek))
        .route("/transport/position", get(position))
        .route("/transport/play/{media_id}", post(play_media_id))
}

async fn play(State(state): State<AppState>) -> ApiResult<()> {
    state.hub.streamer().commands().play().await?;
    Ok(())
}

async fn pause(State(state): State<AppState>) -> ApiResult<()> {
    state.hub.streamer().commands().pause().await?;
    Ok(())
}

async fn stop(State(state): State<AppState>) -> ApiResult<()> {
    state.hub.streamer().commands().stop().await?;
    Ok(())
}

async fn toggle_playback(State(state): State<AppState>) -> ApiResult<()> {
    state.hub.streamer().commands().toggle_playback().await?;
    Ok(())
}

async fn next(State(state): State<AppState>) -> ApiResult<()> {
    state.hub.streamer().commands().next().await?;
    Ok(())
}

async fn previous(State(state): State<AppState>) -> ApiResult<()> {
    state.hub.streamer().commands().previous().await?;
    Ok(())
}

async fn repeat(State(state): State<AppState>) -> ApiResult<()> {
    state.hub.streamer().commands().repeat().await?;
    Ok(())
}

async fn shuffle(State(state): State<AppState>) -> ApiResult<()> {
    state.hub.streamer().commands().shuffle().await?;
    Ok(())
}

async fn seek(State(state): State<AppState>, Json(target): Json<serde_json::Value>) -> ApiResult<()> {
    state.hub.streamer().commands().seek(&target).await?;
    Ok(())
}

async fn position(State(state): State<AppState>) -> Json<TransportState> {
    Json(state.hub.transport_state())
}

async fn play_media_id(State(state): State<AppState>, Path(media_id): Path<String>) -> ApiResult<()> {
    state
        .hub
        .playlists()
        .modify_queue(&media_id, PlaylistModifyAction::Replace, None, &state.hub.settings().all_albums_path)
        .await?;
    state.hub.streamer().commands().play().await?;
    Ok(())
}
