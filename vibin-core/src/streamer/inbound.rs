//! Inbound `smoip` WebSocket message handling, per spec.md §4.3. Each
//! message carries a `path` and a `params.data` payload; handling mutates
//! the adapter's owned state and emits at most one update message per
//! affected channel.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::{Result, VibinError};
use crate::mediaserver::MediaServerHandle;
use crate::model::{PlayStatus, PowerState, QueueItem, TransportAction, UpdateMessageType};

use super::{StreamerInner, UpdateSink};

#[derive(Debug, Deserialize)]
struct SmoipMessage {
    path: String,
    params: SmoipParams,
}

#[derive(Debug, Deserialize)]
struct SmoipParams {
    #[serde(default)]
    data: Value,
}

/// `smoip` control name → normalized `TransportAction`, per spec.md §4.3.
/// Unknown names are dropped.
fn map_control(name: &str) -> Option<TransportAction> {
    match name {
        "pause" => Some(TransportAction::Pause),
        "play" => Some(TransportAction::Play),
        "play_pause" => Some(TransportAction::TogglePlayback),
        "toggle_shuffle" => Some(TransportAction::Shuffle),
        "toggle_repeat" => Some(TransportAction::Repeat),
        "track_next" => Some(TransportAction::Next),
        "track_previous" => Some(TransportAction::Previous),
        "seek" => Some(TransportAction::Seek),
        "stop" => Some(TransportAction::Stop),
        _ => None,
    }
}

pub async fn handle_message(
    text: &str,
    state: &Arc<RwLock<StreamerInner>>,
    updates: &UpdateSink,
    media_server: Option<&MediaServerHandle>,
    http: &Client,
    host: &str,
    all_albums_path: &str,
) -> Result<()> {
    let message: SmoipMessage = serde_json::from_str(text).map_err(|err| VibinError::DeviceError(format!("malformed smoip message: {err}")))?;

    match message.path.as_str() {
        "/zone/play_state" => handle_play_state(&message.params.data, state, updates),
        "/zone/play_state/position" => {
            updates(UpdateMessageType::Position, message.params.data);
            Ok(())
        }
        "/zone/now_playing" => handle_now_playing(&message.params.data, state, updates),
        "/queue/info" => handle_queue_info(state, updates, media_server, http, host, all_albums_path).await,
        "/presets/list" => {
            if let Ok(presets) = serde_json::from_value(message.params.data.clone()) {
                state.write().presets = presets;
            }
            updates(UpdateMessageType::Presets, serde_json::to_value(&state.read().presets).unwrap_or_default());
            Ok(())
        }
        "/system/power" => handle_power(&message.params.data, state, updates),
        other => {
            warn!(path = other, "ignoring unrecognized smoip path");
            Ok(())
        }
    }
}

fn handle_play_state(data: &Value, state: &Arc<RwLock<StreamerInner>>, updates: &UpdateSink) -> Result<()> {
    let mut inner = state.write();

    if let Some(play_state) = data.get("state").and_then(|v| v.as_str()).and_then(parse_play_status) {
        inner.transport.play_state = Some(play_state);
    }

    let mut title = data.get("metadata").and_then(|m| m.get("title")).and_then(|v| v.as_str()).map(str::to_string);
    if title.is_none() {
        title = data.get("metadata").and_then(|m| m.get("station")).and_then(|v| v.as_str()).map(str::to_string);
    }
    if let Some(title) = title {
        inner.currently_playing.active_track.title = Some(title);
    }
    if let Some(artist) = data.get("metadata").and_then(|m| m.get("artist")).and_then(|v| v.as_str()) {
        inner.currently_playing.active_track.artist = Some(artist.to_string());
    }
    if let Some(album) = data.get("metadata").and_then(|m| m.get("album")).and_then(|v| v.as_str()) {
        inner.currently_playing.active_track.album = Some(album.to_string());
    }
    if let Some(duration) = data.get("metadata").and_then(|m| m.get("duration")).and_then(|v| v.as_i64()) {
        inner.currently_playing.active_track.duration = Some(duration);
    }

    // If paused with no active-track metadata, fall back to the current
    // queue item whose title matches.
    if inner.transport.play_state == Some(PlayStatus::Pause) && inner.currently_playing.active_track.title.is_none() {
        if let Some(position) = inner.currently_playing.queue.play_position {
            if let Some(item) = inner.currently_playing.queue.items.get(position as usize) {
                let title = item.title.clone();
                let artist = item.artist.clone();
                let album = item.album.clone();
                inner.currently_playing.active_track.title = title;
                inner.currently_playing.active_track.artist = artist;
                inner.currently_playing.active_track.album = album;
            }
        }
    }

    updates(UpdateMessageType::CurrentlyPlaying, serde_json::to_value(&inner.currently_playing).unwrap_or_default());
    updates(UpdateMessageType::TransportState, serde_json::to_value(&inner.transport).unwrap_or_default());
    Ok(())
}

fn handle_now_playing(data: &Value, state: &Arc<RwLock<StreamerInner>>, updates: &UpdateSink) -> Result<()> {
    let mut inner = state.write();

    if let Some(controls) = data.get("controls").and_then(|v| v.as_array()) {
        inner.transport.active_controls = controls.iter().filter_map(|v| v.as_str()).filter_map(map_control).collect();
    }

    if let Some(source_id) = data.get("source").and_then(|s| s.get("id")).and_then(|v| v.as_str()) {
        if source_id != "MEDIA_PLAYER" {
            inner.currently_playing.album_media_id = None;
            inner.currently_playing.track_media_id = None;
        }
        inner.sources.active = inner.sources.available.iter().find(|s| s.id.as_deref() == Some(source_id)).cloned();
    }

    let mut system_changed = false;
    if let Some(display) = data.get("display") {
        if inner.last_raw_display.as_ref() != Some(display) {
            if let Ok(parsed) = serde_json::from_value(display.clone()) {
                inner.display = parsed;
                system_changed = true;
            }
            inner.last_raw_display = Some(display.clone());
        }
    }

    updates(UpdateMessageType::TransportState, serde_json::to_value(&inner.transport).unwrap_or_default());
    if system_changed {
        updates(UpdateMessageType::System, serde_json::to_value(&inner.display).unwrap_or_default());
    }
    Ok(())
}

fn handle_power(data: &Value, state: &Arc<RwLock<StreamerInner>>, updates: &UpdateSink) -> Result<()> {
    let mut inner = state.write();
    if let Some(power) = data.get("power").and_then(|v| v.as_str()) {
        inner.power = Some(match power {
            "ON" | "on" => PowerState::On,
            "NETWORK" | "network" | "OFF" | "off" => PowerState::Off,
            _ => PowerState::Unknown,
        });
    }
    updates(UpdateMessageType::System, serde_json::to_value(inner.power).unwrap_or_default());
    Ok(())
}

/// Per spec.md §4.3: the `/queue/info` payload itself is not trusted.
/// Instead issue a fresh `queue/list` fetch, enrich each item with media
/// ids, and atomically replace the stored queue.
async fn handle_queue_info(state: &Arc<RwLock<StreamerInner>>, updates: &UpdateSink, media_server: Option<&MediaServerHandle>, http: &Client, host: &str, all_albums_path: &str) -> Result<()> {
    let url = format!("http://{host}/smoip/queue/list");
    let response: Value = http.get(&url).send().await?.error_for_status().map_err(VibinError::from)?.json().await?;

    let raw_items = response.get("data").and_then(|d| d.get("queue")).and_then(|q| q.as_array()).cloned().unwrap_or_default();

    let mut items = Vec::with_capacity(raw_items.len());
    for (index, raw) in raw_items.into_iter().enumerate() {
        let mut item: QueueItem = serde_json::from_value(raw).map_err(|err| VibinError::DeviceError(format!("malformed queue/list entry: {err}")))?;
        item.position = index as u32;

        if let Some(media_server) = media_server {
            if let (Some(album), Some(artist)) = (item.album.clone(), item.artist.clone()) {
                let track_number: Option<u32> = item.track_number.as_deref().and_then(|n| n.parse().ok());
                if let Some((album_id, track_id)) = media_server.find_track_media_id(all_albums_path, &album, &artist, track_number).await {
                    item.album_media_id = Some(album_id);
                    item.track_media_id = Some(track_id);
                }
            }
        }
        items.push(item);
    }

    let play_position = response.get("data").and_then(|d| d.get("currentIndex")).and_then(|v| v.as_u64()).map(|n| n as u32);

    let mut inner = state.write();
    inner.currently_playing.queue.items = items;
    inner.currently_playing.queue.play_position = play_position;
    if let Some(position) = play_position {
        if let Some(item) = inner.currently_playing.queue.items.get(position as usize) {
            let album_media_id = item.album_media_id.clone();
            let track_media_id = item.track_media_id.clone();
            inner.currently_playing.album_media_id = album_media_id;
            inner.currently_playing.track_media_id = track_media_id;
        }
    }

    updates(UpdateMessageType::Queue, serde_json::to_value(&inner.currently_playing.queue).unwrap_or_default());
    updates(UpdateMessageType::CurrentlyPlaying, serde_json::to_value(&inner.currently_playing).unwrap_or_default());
    Ok(())
}

fn parse_play_status(raw: &str) -> Option<PlayStatus> {
    match raw {
        "buffering" => Some(PlayStatus::Buffering),
        "connecting" => Some(PlayStatus::Connecting),
        "no_signal" => Some(PlayStatus::NoSignal),
        "not_ready" => Some(PlayStatus::NotReady),
        "pause" => Some(PlayStatus::Pause),
        "play" => Some(PlayStatus::Play),
        "ready" => Some(PlayStatus::Ready),
        "stop" => Some(PlayStatus::Stop),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_controls_and_drops_unknown() {
        assert_eq!(map_control("play_pause"), Some(TransportAction::TogglePlayback));
        assert_eq!(map_control("unknown_control"), None);
    }

    #[test]
    fn parses_known_play_states() {
        assert_eq!(parse_play_status("no_signal"), Some(PlayStatus::NoSignal));
        assert_eq!(parse_play_status("bogus"), None);
    }
}
