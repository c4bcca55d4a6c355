use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vibin_core::model::{PowerState, StreamerDeviceDisplay};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/system/streamer/power_toggle", post(power_toggle))
        .route("/system/streamer/source", post(set_source))
        .route("/system/streamer/device_display", get(device_display))
}

async fn power_toggle(State(state): State<AppState>) -> ApiResult<()> {
    let current = state.hub.streamer().snapshot_state().power;
    let turn_on = current != Some(PowerState::On);
    state.hub.streamer().commands().set_power(turn_on).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SetSourceBody {
    source: String,
}

async fn set_source(State(state): State<AppState>, Json(body): Json<SetSourceBody>) -> ApiResult<()> {
    state.hub.streamer().commands().set_source(&body.source).await?;
    Ok(())
}

async fn device_display(State(state): State<AppState>) -> Json<StreamerDeviceDisplay> {
    Json(state.hub.streamer().snapshot_state().display)
}
