//! Cambridge StreamMagic acting as a preamp or control-bus amplifier.
//! Reuses the streamer's own `smoip` WebSocket subscription mechanism,
//! scoped to `/zone/state`, and normalizes volume against the device's own
//! reported `volume_step.maximum` (fetched once from `/zone/state/spec`).

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::errors::{Result, VibinError};
use crate::model::{AmplifierAction, AmplifierState, AudioSources, MuteState, PowerState, UpdateMessageType};
use crate::reconnect::{WebSocketWorker, WsOnConnect, WsOnData, WsOnDisconnect, WsOutbound};

use super::UpdateSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMagicAmpMode {
    Preamp,
    ControlBus,
}

impl StreamMagicAmpMode {
    fn supported_actions(self) -> BTreeSet<AmplifierAction> {
        let mut actions = BTreeSet::new();
        match self {
            StreamMagicAmpMode::Preamp => {
                actions.insert(AmplifierAction::Volume);
                actions.insert(AmplifierAction::Mute);
                actions.insert(AmplifierAction::VolumeUpDown);
            }
            StreamMagicAmpMode::ControlBus => {
                actions.insert(AmplifierAction::VolumeUpDown);
            }
        }
        actions
    }
}

#[derive(Debug, Default)]
struct StreamMagicAmpInner {
    power: Option<PowerState>,
    mute: Option<MuteState>,
    volume_raw: Option<u32>,
}

pub struct StreamMagicAmplifierAdapter {
    name: String,
    host: String,
    http: Client,
    mode: StreamMagicAmpMode,
    volume_max: Arc<RwLock<Option<u32>>>,
    state: Arc<RwLock<StreamMagicAmpInner>>,
    worker: Option<WebSocketWorker>,
    outbound: Arc<RwLock<Option<WsOutbound>>>,
}

impl StreamMagicAmplifierAdapter {
    pub async fn spawn(name: String, host: String, mode: StreamMagicAmpMode, http: Client, updates: UpdateSink) -> Result<Self> {
        let volume_max = Arc::new(RwLock::new(fetch_volume_max(&http, &host).await?));

        let state = Arc::new(RwLock::new(StreamMagicAmpInner::default()));
        let outbound = Arc::new(RwLock::new(None));
        let ws_url = format!("ws://{host}/smoip");

        let on_connect: WsOnConnect = {
            let outbound = Arc::clone(&outbound);
            Box::new(move |out: WsOutbound| {
                let frame = serde_json::json!({
                    "path": "/zone/state",
                    "params": { "update": 1, "id": uuid::Uuid::new_v4().to_string() },
                });
                out.send_text(frame.to_string());
                *outbound.write() = Some(out);
            })
        };

        let on_data: WsOnData = {
            let state = Arc::clone(&state);
            let updates = Arc::clone(&updates);
            let volume_max = Arc::clone(&volume_max);
            let name = name.clone();
            Box::new(move |message: Message| {
                if let Message::Text(text) = message {
                    handle_message(&text, &name, mode, &state, &volume_max, &updates);
                }
            })
        };

        let on_disconnect: WsOnDisconnect = {
            let outbound = Arc::clone(&outbound);
            Box::new(move || {
                *outbound.write() = None;
                debug!("streammagic amplifier websocket disconnected");
            })
        };

        let worker = WebSocketWorker::spawn(ws_url, on_connect, on_data, on_disconnect);

        Ok(StreamMagicAmplifierAdapter {
            name,
            host,
            http,
            mode,
            volume_max,
            state,
            worker: Some(worker),
            outbound,
        })
    }

    pub fn snapshot_state(&self) -> AmplifierState {
        let inner = self.state.read();
        let max = *self.volume_max.read();
        AmplifierState {
            name: self.name.clone(),
            supported_actions: self.mode.supported_actions(),
            power: inner.power,
            mute: inner.mute,
            volume: normalize_volume(inner.volume_raw, max),
            sources: AudioSources::default(),
        }
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        let url = format!("http://{}/smoip/system/power", self.host);
        let body = serde_json::json!({ "power": if on { "on" } else { "network" } });
        self.http.post(&url).json(&body).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        if !self.mode.supported_actions().contains(&AmplifierAction::Mute) {
            return Err(VibinError::InputError("this amplifier mode does not support mute".to_string()));
        }
        let url = format!("http://{}/smoip/zone/state", self.host);
        let body = serde_json::json!({ "mute": muted });
        self.http.post(&url).json(&body).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn set_volume(&self, normalized: f32) -> Result<()> {
        if !self.mode.supported_actions().contains(&AmplifierAction::Volume) {
            return Err(VibinError::InputError("this amplifier mode does not support absolute volume".to_string()));
        }
        let max = self.volume_max.read().ok_or_else(|| VibinError::DeviceError("volume_step.maximum is unknown".to_string()))?;
        let raw = (normalized.clamp(0.0, 1.0) * max as f32).round() as u32;
        let url = format!("http://{}/smoip/zone/state", self.host);
        let body = serde_json::json!({ "volume": raw });
        self.http.post(&url).json(&body).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn volume_up_down(&self, up: bool) -> Result<()> {
        let url = format!("http://{}/smoip/zone/state", self.host);
        let body = serde_json::json!({ "volume_step": if up { "up" } else { "down" } });
        self.http.post(&url).json(&body).send().await?.error_for_status().map_err(VibinError::from)?;
        Ok(())
    }

    pub async fn shutdown(mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop().await;
        }
    }
}

fn normalize_volume(raw: Option<u32>, max: Option<u32>) -> Option<f32> {
    match (raw, max) {
        (Some(raw), Some(max)) if max > 0 => Some(raw as f32 / max as f32),
        _ => None,
    }
}

async fn fetch_volume_max(http: &Client, host: &str) -> Result<Option<u32>> {
    let url = format!("http://{host}/smoip/zone/state/spec");
    let response: serde_json::Value = http.get(&url).send().await?.error_for_status().map_err(VibinError::from)?.json().await?;
    Ok(response.get("data").and_then(|d| d.get("volume_step")).and_then(|v| v.get("maximum")).and_then(|v| v.as_u64()).map(|n| n as u32))
}

#[derive(Debug, Deserialize)]
struct ZoneStateMessage {
    path: String,
    params: ZoneStateParams,
}

#[derive(Debug, Deserialize)]
struct ZoneStateParams {
    #[serde(default)]
    data: serde_json::Value,
}

fn handle_message(text: &str, name: &str, mode: StreamMagicAmpMode, state: &Arc<RwLock<StreamMagicAmpInner>>, volume_max: &Arc<RwLock<Option<u32>>>, updates: &UpdateSink) {
    let message: ZoneStateMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(err) => {
            warn!(%err, "malformed streammagic amplifier message");
            return;
        }
    };

    if message.path != "/zone/state" {
        return;
    }

    let data = message.params.data;
    let mut inner = state.write();
    if let Some(power) = data.get("power").and_then(|v| v.as_str()) {
        inner.power = Some(match power {
            "ON" | "on" => PowerState::On,
            "NETWORK" | "network" | "OFF" | "off" => PowerState::Off,
            _ => PowerState::Unknown,
        });
    }
    if let Some(mute) = data.get("mute").and_then(|v| v.as_bool()) {
        inner.mute = Some(if mute { MuteState::On } else { MuteState::Off });
    }
    if let Some(volume) = data.get("volume").and_then(|v| v.as_u64()) {
        inner.volume_raw = Some(volume as u32);
    }

    let snapshot = AmplifierState {
        name: name.to_string(),
        supported_actions: mode.supported_actions(),
        power: inner.power,
        mute: inner.mute,
        volume: normalize_volume(inner.volume_raw, *volume_max.read()),
        sources: AudioSources::default(),
    };
    drop(inner);

    updates(UpdateMessageType::System, serde_json::to_value(snapshot).unwrap_or_default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamp_mode_supports_volume_and_mute() {
        let actions = StreamMagicAmpMode::Preamp.supported_actions();
        assert!(actions.contains(&AmplifierAction::Volume));
        assert!(actions.contains(&AmplifierAction::Mute));
    }

    #[test]
    fn control_bus_mode_supports_only_volume_up_down() {
        let actions = StreamMagicAmpMode::ControlBus.supported_actions();
        assert_eq!(actions.len(), 1);
        assert!(actions.contains(&AmplifierAction::VolumeUpDown));
    }

    #[test]
    fn normalizes_volume_against_reported_maximum() {
        assert_eq!(normalize_volume(Some(40), Some(100)), Some(0.4));
        assert_eq!(normalize_volume(Some(40), None), None);
        assert_eq!(normalize_volume(Some(40), Some(0)), None);
    }
}
