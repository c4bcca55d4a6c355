//! The normalized domain model every adapter translates device-specific
//! state into. Field names and wire shapes follow the Cambridge StreamMagic/
//! Asset-derived vocabulary the whole system is built around (see the
//! glossary): DIDL-Lite media ids, StreamMagic playback states, and so on.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Opaque id minted by the media server (Album/Artist/Track).
pub type MediaId = String;
/// Id minted by the streamer for an item in its active queue, unique within
/// a session only.
pub type QueueItemId = i64;
/// UUID minted by the core when a stored playlist is created.
pub type PlaylistId = String;
/// Whole seconds into the current track.
pub type TransportPosition = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuteState {
    On,
    Off,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayStatus {
    Buffering,
    Connecting,
    NoSignal,
    NotReady,
    Pause,
    Play,
    Ready,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportAction {
    Next,
    Pause,
    Play,
    Previous,
    Repeat,
    Seek,
    Shuffle,
    Stop,
    TogglePlayback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportRepeatState {
    Off,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportShuffleState {
    Off,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaylistModifyAction {
    Replace,
    Append,
    PlayNow,
    PlayNext,
    PlayFromHere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplifierAction {
    Volume,
    Mute,
    VolumeUpDown,
    Power,
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteType {
    Album,
    Track,
}

/// The closed set of channels a subscriber can receive. Each value carries
/// one channel's full current payload — never a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMessageType {
    System,
    #[serde(rename = "UPnPProperties")]
    UpnpProperties,
    TransportState,
    Position,
    CurrentlyPlaying,
    Queue,
    Favorites,
    Presets,
    StoredPlaylists,
    DeviceDisplay,
    PlayState,
    VibinStatus,
}

/// Envelope broadcast to every WebSocket subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateMessage {
    pub id: uuid::Uuid,
    pub client_id: uuid::Uuid,
    pub time: i64,
    #[serde(rename = "type")]
    pub message_type: UpdateMessageType,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: Option<String>,
    pub name: Option<String>,
    pub default_name: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub nameable: Option<bool>,
    pub ui_selectable: Option<bool>,
    pub description: Option<String>,
    pub description_locale: Option<String>,
    pub preferred_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioSources {
    pub available: Vec<AudioSource>,
    pub active: Option<AudioSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamerDeviceDisplayProgress {
    pub position: Option<TransportPosition>,
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamerDeviceDisplay {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub line3: Option<String>,
    pub format: Option<String>,
    pub mqa: Option<String>,
    pub playback_source: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub art_file: Option<String>,
    pub art_url: Option<String>,
    pub progress: Option<StreamerDeviceDisplayProgress>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerState {
    pub name: String,
    pub power: Option<PowerState>,
    pub sources: AudioSources,
    pub display: StreamerDeviceDisplay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaServerState {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmplifierState {
    pub name: String,
    pub supported_actions: BTreeSet<AmplifierAction>,
    pub power: Option<PowerState>,
    pub mute: Option<MuteState>,
    /// Normalized `0.0..=1.0`, or `None` if the amplifier doesn't report a
    /// usable volume range.
    pub volume: Option<f32>,
    pub sources: AudioSources,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemState {
    pub power: Option<PowerState>,
    pub streamer: StreamerState,
    pub media_server: Option<MediaServerState>,
    pub amplifier: Option<AmplifierState>,
}

pub type UpnpServiceName = String;
pub type UpnpPropertyName = String;
pub type UpnpProperties = HashMap<UpnpServiceName, HashMap<UpnpPropertyName, serde_json::Value>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemUpnpProperties {
    pub streamer: UpnpProperties,
    pub media_server: UpnpProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportState {
    pub play_state: Option<PlayStatus>,
    pub active_controls: BTreeSet<TransportAction>,
    pub repeat: Option<TransportRepeatState>,
    pub shuffle: Option<TransportShuffleState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaFormat {
    pub sample_format: Option<String>,
    pub mqa: Option<String>,
    pub codec: Option<String>,
    pub lossless: Option<bool>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u32>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaStream {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveTrack {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub art_url: Option<String>,
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub position: u32,
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub duration: Option<String>,
    pub track_number: Option<String>,
    pub album_art_uri: Option<String>,
    pub uri: Option<String>,
    pub album_media_id: Option<MediaId>,
    pub track_media_id: Option<MediaId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Queue {
    pub play_position: Option<u32>,
    pub items: Vec<QueueItem>,
}

impl Queue {
    /// The `trackMediaId` sequence, in queue order. Used for playlist-sync
    /// comparisons (spec invariant P2/I3) and for `checkOnStartup`.
    pub fn track_media_ids(&self) -> Vec<Option<MediaId>> {
        self.items.iter().map(|item| item.track_media_id.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentlyPlaying {
    pub album_media_id: Option<MediaId>,
    pub track_media_id: Option<MediaId>,
    pub active_track: ActiveTrack,
    pub format: MediaFormat,
    pub stream: MediaStream,
    pub queue: Queue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Album {
    pub id: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub date: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub album_art_uri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artist {
    pub id: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub album_art_uri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    pub album_id: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub date: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<String>,
    pub genre: Option<String>,
    pub album_art_uri: Option<String>,
    pub original_track_number: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaFolder {
    pub creator: Option<String>,
    pub title: Option<String>,
    pub album_art_uri: Option<String>,
    pub artist: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaBrowseSingleLevel {
    pub id: MediaId,
    pub children: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPlaylist {
    pub id: PlaylistId,
    pub name: String,
    pub created: f64,
    pub updated: f64,
    pub entry_ids: Vec<MediaId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredPlaylistStatus {
    pub active_id: Option<PlaylistId>,
    pub is_active_synced_with_store: bool,
    pub is_activating_playlist: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredPlaylists {
    pub status: StoredPlaylistStatus,
    pub playlists: Vec<StoredPlaylist>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FavoriteMedia {
    Track(Track),
    Album(Album),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    #[serde(rename = "type")]
    pub kind: FavoriteType,
    pub media_id: MediaId,
    pub when_favorited: Option<f64>,
    pub media: Option<FavoriteMedia>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LyricsChunk {
    pub header: Option<String>,
    pub body: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lyrics {
    pub lyrics_id: String,
    pub media_id: Option<MediaId>,
    pub is_valid: bool,
    pub chunks: Vec<LyricsChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalServiceLink {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    pub media_id: Option<MediaId>,
    pub links: HashMap<String, Vec<ExternalServiceLink>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub id: Option<i32>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub state: Option<String>,
    pub is_playing: Option<bool>,
    pub art_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Presets {
    pub start: Option<i32>,
    pub end: Option<i32>,
    pub max_presets: Option<i32>,
    pub presets: Vec<Preset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketClientDetails {
    pub id: String,
    pub when_connected: f64,
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VibinStatus {
    pub vibin_version: String,
    pub start_time: f64,
    pub system_node: String,
    pub system_platform: String,
    pub system_version: String,
    pub clients: Vec<WebSocketClientDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VibinSettings {
    pub all_albums_path: String,
    pub new_albums_path: String,
    pub all_artists_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_status_serializes_to_source_vocabulary() {
        assert_eq!(serde_json::to_string(&PlayStatus::NoSignal).unwrap(), "\"no_signal\"");
        assert_eq!(serde_json::to_string(&PlayStatus::NotReady).unwrap(), "\"not_ready\"");
    }

    #[test]
    fn playlist_modify_action_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&PlaylistModifyAction::PlayFromHere).unwrap(),
            "\"PLAY_FROM_HERE\""
        );
    }

    #[test]
    fn update_message_type_renames_upnp_properties() {
        assert_eq!(
            serde_json::to_string(&UpdateMessageType::UpnpProperties).unwrap(),
            "\"UPnPProperties\""
        );
    }

    #[test]
    fn queue_track_media_ids_preserve_order() {
        let queue = Queue {
            play_position: Some(0),
            items: vec![
                QueueItem {
                    id: 1,
                    position: 0,
                    title: None,
                    album: None,
                    artist: None,
                    duration: None,
                    track_number: None,
                    album_art_uri: None,
                    uri: None,
                    album_media_id: None,
                    track_media_id: Some("m1".into()),
                },
                QueueItem {
                    id: 2,
                    position: 1,
                    title: None,
                    album: None,
                    artist: None,
                    duration: None,
                    track_number: None,
                    album_art_uri: None,
                    uri: None,
                    album_media_id: None,
                    track_media_id: Some("m2".into()),
                },
            ],
        };
        assert_eq!(
            queue.track_media_ids(),
            vec![Some("m1".to_string()), Some("m2".to_string())]
        );
    }
}
