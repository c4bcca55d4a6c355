//! Streamer adapter: owns the long-lived connection to the Cambridge Audio
//! StreamMagic device (HTTP commands plus the `smoip` WebSocket), maintains
//! `TransportState`/`CurrentlyPlaying`/`Queue`/`Presets`/`StreamerState`, and
//! accepts transport/queue commands. Grounded on
//! `pmocontrol/src/music_renderer/watcher.rs` for the HMS-position parsing
//! idiom and on `reconnect::WebSocketWorker` for the connection lifecycle.

mod control;
mod inbound;
mod seek;

pub use control::StreamerCommands;
pub use seek::{SeekTarget, parse_seek_target};

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Client;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use vibin_upnp::DeviceDescription;

use crate::errors::Result;
use crate::mediaserver::MediaServerHandle;
use crate::model::{AudioSources, CurrentlyPlaying, PowerState, Presets, Queue, StreamerDeviceDisplay, StreamerState, TransportState};
use crate::reconnect::{WebSocketWorker, WsOutbound};

/// Subscriptions sent on WebSocket connect, per spec.md §4.3.
const SUBSCRIBE_PATHS: &[(&str, u32)] = &[
    ("/zone/play_state", 1),
    ("/zone/play_state/position", 1),
    ("/zone/now_playing", 1),
    ("/queue/info", 1),
    ("/presets/list", 1),
    ("/system/power", 100),
];

/// The streamer's own mutable view of the world, guarded by a single lock.
/// Every field is written exclusively from the WebSocket worker's inbound
/// path (spec.md §5's ordering guarantee), so the lock is only ever
/// contended against REST-thread readers.
#[derive(Debug, Default)]
pub struct StreamerInner {
    pub power: Option<PowerState>,
    pub sources: AudioSources,
    pub display: StreamerDeviceDisplay,
    pub transport: TransportState,
    pub currently_playing: CurrentlyPlaying,
    pub presets: Presets,
    pub last_raw_display: Option<serde_json::Value>,
}

pub type UpdateSink = Arc<dyn Fn(crate::model::UpdateMessageType, serde_json::Value) + Send + Sync>;

pub type StreamerHandle = Arc<StreamerAdapter>;

pub struct StreamerAdapter {
    pub name: String,
    host: String,
    http: Client,
    state: Arc<RwLock<StreamerInner>>,
    media_server: Option<MediaServerHandle>,
    all_albums_path: String,
    worker: Option<WebSocketWorker>,
    outbound: Arc<RwLock<Option<WsOutbound>>>,
}

impl StreamerAdapter {
    pub fn spawn(desc: &DeviceDescription, http: Client, media_server: Option<MediaServerHandle>, all_albums_path: String, updates: UpdateSink) -> Result<Self> {
        let host = reqwest::Url::parse(&desc.location)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default();

        let state = Arc::new(RwLock::new(StreamerInner::default()));
        let outbound = Arc::new(RwLock::new(None));
        let ws_url = format!("ws://{host}/smoip");

        let worker_state = Arc::clone(&state);
        let worker_outbound = Arc::clone(&outbound);
        let worker_updates = Arc::clone(&updates);
        let worker_media_server = media_server.clone();
        let worker_http = http.clone();

        let on_connect: crate::reconnect::WsOnConnect = {
            let outbound = Arc::clone(&worker_outbound);
            Box::new(move |out: WsOutbound| {
                for (path, update) in SUBSCRIBE_PATHS {
                    let frame = serde_json::json!({
                        "path": path,
                        "params": { "update": update, "id": uuid::Uuid::new_v4().to_string() },
                    });
                    out.send_text(frame.to_string());
                }
                *outbound.write() = Some(out);
            })
        };

        // Inbound frames must be handled strictly in arrival order (spec.md
        // §5), but `/queue/info` needs an `.await`ed HTTP round-trip while
        // every other path is synchronous. A detached `tokio::spawn` per
        // frame would let those tasks race the scheduler, so instead the
        // read loop only enqueues; a single consumer task drains the queue
        // and awaits each message to completion before starting the next.
        let (message_tx, mut message_rx) = tokio::sync::mpsc::unbounded_channel::<String>();

        {
            let state = Arc::clone(&worker_state);
            let updates = Arc::clone(&worker_updates);
            let media_server = worker_media_server.clone();
            let http = worker_http.clone();
            let host = host.clone();
            let all_albums_path = all_albums_path.clone();
            tokio::spawn(async move {
                while let Some(text) = message_rx.recv().await {
                    if let Err(err) = inbound::handle_message(&text, &state, &updates, media_server.as_ref(), &http, &host, &all_albums_path).await {
                        warn!(%err, "failed to process smoip inbound message");
                    }
                }
            });
        }

        let on_data: crate::reconnect::WsOnData = Box::new(move |message: Message| {
            if let Message::Text(text) = message {
                let _ = message_tx.send(text.to_string());
            }
        });

        let on_disconnect: crate::reconnect::WsOnDisconnect = {
            let outbound = Arc::clone(&worker_outbound);
            Box::new(move || {
                *outbound.write() = None;
                debug!("streamer websocket disconnected");
            })
        };

        let worker = WebSocketWorker::spawn(ws_url, on_connect, on_data, on_disconnect);

        Ok(StreamerAdapter {
            name: desc.friendly_name.clone(),
            host,
            http,
            state,
            media_server,
            all_albums_path,
            worker: Some(worker),
            outbound,
        })
    }

    pub fn snapshot_state(&self) -> StreamerState {
        let inner = self.state.read();
        StreamerState {
            name: self.name.clone(),
            power: inner.power,
            sources: inner.sources.clone(),
            display: inner.display.clone(),
        }
    }

    pub fn snapshot_transport(&self) -> TransportState {
        self.state.read().transport.clone()
    }

    pub fn snapshot_currently_playing(&self) -> CurrentlyPlaying {
        self.state.read().currently_playing.clone()
    }

    pub fn snapshot_queue(&self) -> Queue {
        self.state.read().currently_playing.queue.clone()
    }

    pub fn snapshot_presets(&self) -> Presets {
        self.state.read().presets.clone()
    }

    pub fn commands(&self) -> StreamerCommands<'_> {
        StreamerCommands::new(&self.http, &self.host, &self.state)
    }

    pub fn media_server(&self) -> Option<&MediaServerHandle> {
        self.media_server.as_ref()
    }

    pub fn all_albums_path(&self) -> &str {
        &self.all_albums_path
    }

    pub async fn shutdown(mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop().await;
        }
    }
}
