//! Outbound streamer commands: transport controls (idempotent per
//! spec.md §4.3) and queue mutation. Transport commands are HTTP GETs to
//! `zone/play_control`; queue mutation POSTs a percent-encoded DIDL-Lite
//! payload built by `vibin-didl`.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Client;
use tracing::debug;

use crate::errors::{Result, VibinError};
use crate::mediaserver::MediaServerHandle;
use crate::model::{PlayStatus, PlaylistModifyAction, QueueItemId, TransportAction};

use super::seek::{SeekTarget, parse_seek_target};
use super::StreamerInner;

pub struct StreamerCommands<'a> {
    http: &'a Client,
    host: &'a str,
    state: &'a Arc<RwLock<StreamerInner>>,
}

impl<'a> StreamerCommands<'a> {
    pub fn new(http: &'a Client, host: &'a str, state: &'a Arc<RwLock<StreamerInner>>) -> Self {
        StreamerCommands { http, host, state }
    }

    async fn play_control(&self, action: &str, params: &[(&str, String)]) -> Result<()> {
        let mut url = reqwest::Url::parse(&format!("http://{}/smoip/zone/play_control", self.host))
            .map_err(|err| VibinError::Internal(format!("invalid streamer host '{}': {err}", self.host)))?;
        url.query_pairs_mut().append_pair("action", action);
        for (key, value) in params {
            url.query_pairs_mut().append_pair(key, value);
        }

        debug!(%url, "streamer play_control");
        self.http.get(url).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    fn active_controls(&self) -> std::collections::BTreeSet<TransportAction> {
        self.state.read().transport.active_controls.clone()
    }

    fn play_state(&self) -> Option<PlayStatus> {
        self.state.read().transport.play_state
    }

    pub async fn play(&self) -> Result<()> {
        if self.play_state() == Some(PlayStatus::Play) || !self.active_controls().contains(&TransportAction::Play) {
            return Ok(());
        }
        self.play_control("play", &[]).await
    }

    pub async fn pause(&self) -> Result<()> {
        if self.play_state() == Some(PlayStatus::Pause) || !self.active_controls().contains(&TransportAction::Pause) {
            return Ok(());
        }
        self.play_control("pause", &[]).await
    }

    pub async fn toggle_playback(&self) -> Result<()> {
        self.play_control("play_pause", &[]).await
    }

    pub async fn stop(&self) -> Result<()> {
        if !self.active_controls().contains(&TransportAction::Stop) {
            return Err(VibinError::InputError("stop is not in the streamer's active controls".to_string()));
        }
        self.play_control("stop", &[]).await
    }

    pub async fn next(&self) -> Result<()> {
        self.play_control("next", &[]).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.play_control("previous", &[]).await
    }

    pub async fn repeat(&self) -> Result<()> {
        self.play_control("repeat", &[]).await
    }

    pub async fn shuffle(&self) -> Result<()> {
        self.play_control("shuffle", &[]).await
    }

    pub async fn seek(&self, input: &serde_json::Value) -> Result<()> {
        if !self.active_controls().contains(&TransportAction::Seek) {
            return Err(VibinError::InputError("seek is not in the streamer's active controls".to_string()));
        }
        let duration = self.state.read().currently_playing.active_track.duration;
        let SeekTarget { seconds } = parse_seek_target(input, duration)?;
        self.play_control("seek", &[("value", seconds.to_string())]).await
    }

    pub async fn play_preset(&self, preset_id: i32) -> Result<()> {
        let url = format!("http://{}/smoip/presets/recall?preset={preset_id}", self.host);
        self.http.get(&url).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        let url = format!("http://{}/smoip/system/power", self.host);
        let body = serde_json::json!({ "power": if on { "on" } else { "network" } });
        self.http.post(&url).json(&body).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn set_source(&self, source_id: &str) -> Result<()> {
        let url = format!("http://{}/smoip/zone/source", self.host);
        let body = serde_json::json!({ "id": source_id });
        self.http.post(&url).json(&body).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    /// Mutates the active queue. `media_id` identifies the track or album
    /// to act on; for `PLAY_FROM_HERE` it is an album id and `track_index`
    /// selects the starting track within it.
    pub async fn modify_queue(&self, media_server: Option<&MediaServerHandle>, action: PlaylistModifyAction, media_id: &str, track_index: Option<usize>, all_albums_path: &str) -> Result<()> {
        let media_server = media_server.ok_or_else(|| VibinError::MissingDependencyError("queue mutation requires a media server".to_string()))?;

        let metadata = media_server.metadata(media_id).await?;
        let didl = build_didl_for(&metadata)?;
        let encoded = vibin_didl::percent_encode_didl(&didl);

        let smoip_action = match action {
            PlaylistModifyAction::Replace => "REPLACE",
            PlaylistModifyAction::Append => "APPEND",
            PlaylistModifyAction::PlayNow => "PLAY_NOW",
            PlaylistModifyAction::PlayNext => "PLAY_NEXT",
            PlaylistModifyAction::PlayFromHere => "PLAY_FROM_HERE",
        };

        let mut url = format!("http://{}/smoip/queue/add?action={smoip_action}&didl={encoded}&server_udn={}", self.host, media_server.udn);
        if action == PlaylistModifyAction::PlayFromHere {
            if let Some(track_index) = track_index {
                url.push_str(&format!("&play_from_id={track_index}"));
            }
        }
        let _ = all_albums_path;
        self.http.get(&url).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn clear_queue(&self) -> Result<()> {
        let url = format!("http://{}/smoip/queue/clear", self.host);
        self.http.get(&url).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn set_active_queue_index(&self, queue_item_id: QueueItemId) -> Result<()> {
        let url = format!("http://{}/smoip/queue/play?id={queue_item_id}", self.host);
        self.http.get(&url).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn delete_queue_item(&self, queue_item_id: QueueItemId) -> Result<()> {
        let url = format!("http://{}/smoip/queue/delete?id={queue_item_id}", self.host);
        self.http.get(&url).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn move_queue_item(&self, queue_item_id: QueueItemId, from_position: u32, to_position: u32) -> Result<()> {
        let url = format!("http://{}/smoip/queue/move?id={queue_item_id}&from={from_position}&to={to_position}", self.host);
        self.http.get(&url).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }
}

fn build_didl_for(metadata: &serde_json::Value) -> Result<String> {
    let track = vibin_didl::TrackMetadata {
        media_id: metadata.get("id").and_then(|v| v.as_str()).unwrap_or_default(),
        title: metadata.get("title").and_then(|v| v.as_str()).unwrap_or_default(),
        artist: metadata.get("artist").and_then(|v| v.as_str()),
        album: metadata.get("album").and_then(|v| v.as_str()),
        track_number: metadata.get("original_track_number").and_then(|v| v.as_u64()).map(|n| n as u32),
        audio_url: metadata.get("audio_url").and_then(|v| v.as_str()).unwrap_or_default(),
        protocol_info: "http-get:*:audio/flac:*",
    };
    vibin_didl::build_track_didl(&track).map_err(|err| VibinError::MediaServerError(format!("could not build DIDL-Lite metadata: {err}")))
}
