//! The Hub: holds every adapter handle, composes their state into a single
//! system view, and fans typed `UpdateMessage`s out to subscribers.
//! Subscriber bookkeeping is grounded on
//! `pmocontrol/src/events.rs`'s retain-on-send-failure broadcast idiom,
//! adapted from channel-based subscribers to callback handlers (spec.md
//! §4.7 requires synchronous, non-blocking handler invocation plus an
//! explicit id-keyed unsubscribe).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::warn;
use vibin_config::Store;

use crate::amplifier::AmplifierAdapter;
use crate::errors::{Result, VibinError};
use crate::favorites::FavoritesManager;
use crate::links::LinksManager;
use crate::lyrics::LyricsManager;
use crate::mediaserver::MediaServerHandle;
use crate::model::{
    CurrentlyPlaying, FavoriteType, MediaId, Presets, Queue, StoredPlaylists, SystemState, SystemUpnpProperties, TransportState, UpdateMessage, UpdateMessageType, UpnpProperties,
    UpnpPropertyName, UpnpServiceName, VibinSettings,
};
use crate::playlists::PlaylistReconciler;
use crate::streamer::StreamerHandle;

pub type SubscriberHandler = Arc<dyn Fn(&UpdateMessage) + Send + Sync>;

/// Opaque handle returned by `subscribe`, used to `unsubscribe` later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    handler: SubscriberHandler,
}

pub struct Hub {
    streamer: StreamerHandle,
    media_server: Option<MediaServerHandle>,
    amplifier: Option<Arc<AmplifierAdapter>>,
    playlists: Arc<PlaylistReconciler>,
    favorites: Arc<FavoritesManager>,
    lyrics: Arc<LyricsManager>,
    links: Arc<LinksManager>,
    store: Arc<Store>,
    settings: VibinSettings,
    subscribers: Mutex<Vec<Subscriber>>,
    next_subscriber_id: AtomicU64,
    upnp_properties: RwLock<SystemUpnpProperties>,
}

impl Hub {
    pub fn new(
        streamer: StreamerHandle,
        media_server: Option<MediaServerHandle>,
        amplifier: Option<Arc<AmplifierAdapter>>,
        playlists: Arc<PlaylistReconciler>,
        favorites: Arc<FavoritesManager>,
        lyrics: Arc<LyricsManager>,
        links: Arc<LinksManager>,
        store: Arc<Store>,
        settings: VibinSettings,
    ) -> Self {
        Hub {
            streamer,
            media_server,
            amplifier,
            playlists,
            favorites,
            lyrics,
            links,
            store,
            settings,
            subscribers: Mutex::new(Vec::new()),
            next_subscriber_id: AtomicU64::new(1),
            upnp_properties: RwLock::new(SystemUpnpProperties::default()),
        }
    }

    pub fn settings(&self) -> &VibinSettings {
        &self.settings
    }

    pub fn streamer(&self) -> &StreamerHandle {
        &self.streamer
    }

    pub fn media_server(&self) -> Option<&MediaServerHandle> {
        self.media_server.as_ref()
    }

    pub fn amplifier(&self) -> Option<&Arc<AmplifierAdapter>> {
        self.amplifier.as_ref()
    }

    pub fn playlists(&self) -> &PlaylistReconciler {
        &self.playlists
    }

    pub fn lyrics(&self) -> &LyricsManager {
        &self.lyrics
    }

    pub fn links(&self) -> &LinksManager {
        &self.links
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // --- snapshot getters (spec.md §4.7) ---

    pub fn system_state(&self) -> SystemState {
        SystemState {
            power: self.streamer.snapshot_state().power,
            streamer: self.streamer.snapshot_state(),
            media_server: self.media_server.as_ref().map(|m| crate::model::MediaServerState { name: m.name.clone() }),
            amplifier: self.amplifier.as_ref().map(|a| a.snapshot_state()),
        }
    }

    pub fn currently_playing(&self) -> CurrentlyPlaying {
        self.streamer.snapshot_currently_playing()
    }

    pub fn transport_state(&self) -> TransportState {
        self.streamer.snapshot_transport()
    }

    pub fn queue(&self) -> Queue {
        self.streamer.snapshot_queue()
    }

    pub fn presets(&self) -> Presets {
        self.streamer.snapshot_presets()
    }

    pub async fn favorites(&self, kind: Option<FavoriteType>) -> Result<Vec<crate::model::Favorite>> {
        self.favorites.list(kind).await
    }

    /// Adds a favorite and broadcasts the refreshed, hydrated list.
    pub async fn add_favorite(&self, kind: FavoriteType, media_id: &str) -> Result<()> {
        self.favorites.add(kind, media_id)?;
        self.publish_favorites().await;
        Ok(())
    }

    /// Removes a favorite and broadcasts the refreshed, hydrated list.
    pub async fn remove_favorite(&self, media_id: &MediaId) -> Result<()> {
        self.favorites.remove(media_id)?;
        self.publish_favorites().await;
        Ok(())
    }

    async fn publish_favorites(&self) {
        if let Ok(favorites) = self.favorites(None).await {
            self.publish(UpdateMessageType::Favorites, serde_json::to_value(favorites).unwrap_or_default());
        }
    }

    pub fn stored_playlists(&self) -> Result<StoredPlaylists> {
        self.playlists.snapshot()
    }

    pub fn upnp_properties(&self) -> SystemUpnpProperties {
        self.upnp_properties.read().clone()
    }

    /// Merges a freshly-received GENA `NOTIFY` body's property set into the
    /// named device's UPnP property bag and emits an `UPnPProperties`
    /// update. Called from the (out-of-crate) `/upnpevents` ingress.
    pub fn report_upnp_properties(&self, device: UpnpPropertyDevice, service: UpnpServiceName, values: HashMap<UpnpPropertyName, serde_json::Value>) {
        {
            let mut properties = self.upnp_properties.write();
            let bag = match device {
                UpnpPropertyDevice::Streamer => &mut properties.streamer,
                UpnpPropertyDevice::MediaServer => &mut properties.media_server,
            };
            bag.entry(service).or_default().extend(values);
        }
        self.publish(UpdateMessageType::UpnpProperties, serde_json::to_value(self.upnp_properties()).unwrap_or_default());
    }

    /// The fixed-order priming burst sent to a newly connected subscriber.
    pub async fn current_state_messages(&self) -> Vec<UpdateMessage> {
        let mut messages = Vec::with_capacity(7);
        messages.push(self.message(UpdateMessageType::System, serde_json::to_value(self.system_state()).unwrap_or_default()));
        messages.push(self.message(UpdateMessageType::UpnpProperties, serde_json::to_value(self.upnp_properties()).unwrap_or_default()));
        messages.push(self.message(UpdateMessageType::TransportState, serde_json::to_value(self.transport_state()).unwrap_or_default()));
        messages.push(self.message(UpdateMessageType::CurrentlyPlaying, serde_json::to_value(self.currently_playing()).unwrap_or_default()));
        let favorites = self.favorites(None).await.unwrap_or_default();
        messages.push(self.message(UpdateMessageType::Favorites, serde_json::to_value(favorites).unwrap_or_default()));
        messages.push(self.message(UpdateMessageType::Presets, serde_json::to_value(self.presets()).unwrap_or_default()));
        let stored_playlists = self.stored_playlists().unwrap_or_default();
        messages.push(self.message(UpdateMessageType::StoredPlaylists, serde_json::to_value(stored_playlists).unwrap_or_default()));
        messages
    }

    fn message(&self, message_type: UpdateMessageType, payload: serde_json::Value) -> UpdateMessage {
        UpdateMessage {
            id: uuid::Uuid::new_v4(),
            client_id: uuid::Uuid::nil(),
            time: now_millis(),
            message_type,
            payload,
        }
    }

    /// Forwards one typed message to every live subscriber, dropping any
    /// whose receiving end has gone away. Every `Queue` broadcast is also
    /// the only signal that the streamer's queue actually changed after
    /// startup, so it doubles as the trigger for stored-playlist drift
    /// detection (spec.md §4.6 P2).
    fn publish(&self, message_type: UpdateMessageType, payload: serde_json::Value) {
        if message_type == UpdateMessageType::Queue {
            let track_media_ids = self.streamer.snapshot_queue().track_media_ids();
            if let Err(err) = self.playlists.on_streamer_queue_modified(&track_media_ids) {
                warn!(%err, "failed to reconcile stored playlist against streamer queue");
            }
        }

        let message = self.message(message_type, payload);
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (subscriber.handler)(&message))).is_ok()
        });
    }

    /// The callback every adapter is constructed with: translates a raw
    /// `(UpdateMessageType, payload)` pair from an adapter's own inbound
    /// path into a broadcast. Handlers run synchronously on the adapter's
    /// thread and must not block (spec.md §4.7).
    pub fn update_sink(self: &Arc<Self>) -> crate::streamer::UpdateSink {
        let hub = Arc::clone(self);
        Arc::new(move |message_type, payload| {
            hub.publish(message_type, payload);
        })
    }

    pub fn subscribe(&self, handler: SubscriberHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscriber_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers.lock().push(Subscriber { id, handler });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().retain(|subscriber| subscriber.id != id);
    }

    // --- command shortcuts (spec.md §4.7) ---

    pub async fn play_album(&self, album_id: &str) -> Result<()> {
        self.playlists.modify_queue(album_id, crate::model::PlaylistModifyAction::Replace, None, &self.settings.all_albums_path).await?;
        self.streamer.commands().play().await
    }

    pub async fn play_track(&self, track_id: &str) -> Result<()> {
        self.playlists.modify_queue(track_id, crate::model::PlaylistModifyAction::Replace, None, &self.settings.all_albums_path).await?;
        self.streamer.commands().play().await
    }

    /// Clears the queue, appends up to `max_count` of `ids` in order, and
    /// starts playback.
    pub async fn play_ids(&self, ids: &[MediaId], max_count: Option<usize>) -> Result<()> {
        let limit = max_count.unwrap_or(ids.len()).min(ids.len());
        if limit == 0 {
            return Err(VibinError::InputError("playIds requires at least one media id".to_string()));
        }

        self.playlists.clear_queue().await?;
        for (index, id) in ids.iter().take(limit).enumerate() {
            let action = if index == 0 {
                crate::model::PlaylistModifyAction::Replace
            } else {
                crate::model::PlaylistModifyAction::Append
            };
            self.playlists.modify_queue(id, action, None, &self.settings.all_albums_path).await?;
        }
        self.streamer.commands().play().await
    }

    pub async fn play_favorite_albums(&self, max_count: Option<usize>) -> Result<()> {
        let favorites = self.favorites(Some(FavoriteType::Album)).await?;
        let ids: Vec<MediaId> = favorites.into_iter().map(|f| f.media_id).collect();
        self.play_ids(&ids, max_count).await
    }

    pub async fn play_favorite_tracks(&self, max_count: Option<usize>) -> Result<()> {
        let favorites = self.favorites(Some(FavoriteType::Track)).await?;
        let ids: Vec<MediaId> = favorites.into_iter().map(|f| f.media_id).collect();
        self.play_ids(&ids, max_count).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpnpPropertyDevice {
    Streamer,
    MediaServer,
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let subscribers: Mutex<Vec<Subscriber>> = Mutex::new(Vec::new());
        let next_id = AtomicU64::new(1);

        let id = {
            let counter = Arc::clone(&delivered);
            let handler: SubscriberHandler = Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            let id = SubscriptionId(next_id.fetch_add(1, Ordering::SeqCst));
            subscribers.lock().push(Subscriber { id, handler });
            id
        };

        subscribers.lock().retain(|s| s.id != id);
        assert!(subscribers.lock().is_empty());
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }
}
