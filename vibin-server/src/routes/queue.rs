use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vibin_core::model::{MediaId, PlaylistModifyAction, Queue, QueueItemId};
use vibin_core::VibinError;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queue", get(get_queue))
        .route("/queue/modify", post(modify_queue))
        .route("/queue/modify/{media_id}", post(modify_queue_single))
        .route("/queue/play/id/{item_id}", post(play_by_id))
        .route("/queue/play/position/{position}", post(play_by_position))
        .route("/queue/move/{item_id}", post(move_item))
        .route("/queue/clear", post(clear_queue))
        .route("/queue/delete/{item_id}", post(delete_item))
}

async fn get_queue(State(state): State<AppState>) -> Json<Queue> {
    Json(state.hub.queue())
}

#[derive(Debug, Deserialize)]
struct ModifyQueueBody {
    action: PlaylistModifyAction,
    #[serde(rename = "maxCount")]
    max_count: Option<usize>,
    #[serde(rename = "mediaIds")]
    media_ids: Vec<MediaId>,
}

async fn modify_queue(State(state): State<AppState>, Json(body): Json<ModifyQueueBody>) -> ApiResult<()> {
    if body.action != PlaylistModifyAction::Replace {
        return Err(VibinError::InputError(format!("bulk queue modification only supports REPLACE, got {:?}", body.action)).into());
    }
    state.hub.play_ids(&body.media_ids, body.max_count).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ModifyQuerySingle {
    action: PlaylistModifyAction,
    /// Historically-inconsistent query name for the starting track within
    /// an album, per spec.md §9: both spellings are accepted on ingress.
    play_from_id: Option<MediaId>,
    insert_index: Option<usize>,
}

async fn modify_queue_single(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
    Query(query): Query<ModifyQuerySingle>,
) -> ApiResult<()> {
    let track_index = match (query.insert_index, &query.play_from_id) {
        (Some(index), _) => Some(index),
        (None, Some(play_from_id)) => resolve_track_index(&state, &media_id, play_from_id).await?,
        (None, None) => None,
    };

    state
        .hub
        .playlists()
        .modify_queue(&media_id, query.action, track_index, &state.hub.settings().all_albums_path)
        .await?;
    Ok(())
}

async fn resolve_track_index(state: &AppState, album_media_id: &str, play_from_id: &str) -> ApiResult<Option<usize>> {
    let Some(media_server) = state.hub.media_server() else {
        return Ok(None);
    };
    let children = media_server.children(album_media_id).await?;
    Ok(children
        .iter()
        .position(|child| child.get("id").and_then(|v| v.as_str()) == Some(play_from_id)))
}

async fn play_by_id(State(state): State<AppState>, Path(item_id): Path<QueueItemId>) -> ApiResult<()> {
    state.hub.streamer().commands().set_active_queue_index(item_id).await?;
    Ok(())
}

async fn play_by_position(State(state): State<AppState>, Path(position): Path<u32>) -> ApiResult<()> {
    let queue = state.hub.queue();
    let item = queue
        .items
        .iter()
        .find(|item| item.position == position)
        .ok_or_else(|| VibinError::NotFound(format!("no queue item at position {position}")))?;
    state.hub.streamer().commands().set_active_queue_index(item.id).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct MoveQuery {
    from_position: u32,
    to_position: u32,
}

async fn move_item(State(state): State<AppState>, Path(item_id): Path<QueueItemId>, Query(query): Query<MoveQuery>) -> ApiResult<()> {
    state.hub.streamer().commands().move_queue_item(item_id, query.from_position, query.to_position).await?;
    Ok(())
}

async fn clear_queue(State(state): State<AppState>) -> ApiResult<()> {
    state.hub.playlists().clear_queue().await?;
    Ok(())
}

async fn delete_item(State(state): State<AppState>, Path(item_id): Path<QueueItemId>) -> ApiResult<()> {
    state.hub.streamer().commands().delete_queue_item(item_id).await?;
    Ok(())
}
