//! Media-server adapter: browses a DIDL-Lite-serving UPnP ContentDirectory
//! (Asset UPnP), caches Albums/Artists/Tracks, and answers by-id lookups.
//! Grounded on `vibin-upnp::soap` for the Browse/GetSearchCapabilities
//! calls and on the teacher's semaphore-gated worker-pool shape
//! (`pmocontrol/src/discovery/upnp_discovery.rs` uses a bounded channel for
//! a similar reason: cap concurrent device requests).

mod browse;
mod cache;
mod filename;

pub use filename::ids_from_filename;

use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use vibin_upnp::DeviceDescription;

use crate::errors::{Result, VibinError};
use crate::model::{Album, Artist, MediaId, Track};

use cache::{CollectionCache, MetadataCache};

const MAX_CONCURRENT_BROWSES: usize = 2;
/// Metadata TTL, per spec.md §4.4.
const METADATA_TTL: std::time::Duration = std::time::Duration::from_secs(5);

pub struct MediaServerAdapter {
    pub name: String,
    pub udn: String,
    http: Client,
    control_url: String,
    service_type: String,
    browse_permits: Arc<Semaphore>,
    albums: CollectionCache<Album>,
    new_albums: CollectionCache<Album>,
    artists: CollectionCache<Artist>,
    tracks: CollectionCache<Track>,
    metadata: MetadataCache,
}

/// A cheaply cloneable handle, shared with the streamer adapter so it can
/// resolve DIDL-Lite metadata for queue mutations without owning the
/// media-server's internal state.
pub type MediaServerHandle = Arc<MediaServerAdapter>;

impl MediaServerAdapter {
    pub fn new(desc: &DeviceDescription, http: Client) -> Result<Self> {
        let service = desc
            .service("ContentDirectory")
            .ok_or_else(|| VibinError::MediaServerError(format!("{} does not expose ContentDirectory", desc.friendly_name)))?;

        Ok(MediaServerAdapter {
            name: desc.friendly_name.clone(),
            udn: desc.udn.clone(),
            http,
            control_url: desc.resolve_url(&service.control_url),
            service_type: service.service_type.clone(),
            browse_permits: Arc::new(Semaphore::new(MAX_CONCURRENT_BROWSES)),
            albums: CollectionCache::new(),
            new_albums: CollectionCache::new(),
            artists: CollectionCache::new(),
            tracks: CollectionCache::new(),
            metadata: MetadataCache::new(METADATA_TTL),
        })
    }

    /// `Browse(BrowseDirectChildren)`, gated by the 2-permit semaphore.
    pub async fn children(&self, parent_id: &str) -> Result<Vec<serde_json::Value>> {
        let _permit = self.browse_permits.acquire().await.expect("semaphore never closed");
        let started = Instant::now();
        let in_flight = MAX_CONCURRENT_BROWSES - self.browse_permits.available_permits();
        debug!(parent_id, in_flight, "media server Browse(BrowseDirectChildren)");

        let result = browse::browse_children(&self.http, &self.control_url, &self.service_type, parent_id).await;

        debug!(parent_id, elapsed_ms = started.elapsed().as_millis(), "media server Browse complete");
        result
    }

    /// `Browse(BrowseMetadata)`, with a 5-second per-id cache.
    pub async fn metadata(&self, id: &str) -> Result<serde_json::Value> {
        if let Some(cached) = self.metadata.get(id) {
            return Ok(cached);
        }

        let _permit = self.browse_permits.acquire().await.expect("semaphore never closed");
        let value = browse::browse_metadata(&self.http, &self.control_url, &self.service_type, id).await?;
        self.metadata.insert(id.to_string(), value.clone());
        Ok(value)
    }

    /// Walks a slash-separated navigation hint (e.g. `vibin-core`'s
    /// `allAlbumsPath`) by repeated `children` lookups, matching titles at
    /// each level.
    pub async fn resolve_path(&self, path: &str) -> Result<String> {
        let mut parent_id = "0".to_string();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let children = self.children(&parent_id).await?;
            let found = children.iter().find(|child| child.get("title").and_then(|t| t.as_str()) == Some(segment));
            match found {
                Some(child) => {
                    parent_id = child.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                }
                None => return Err(VibinError::NotFound(format!("no media folder named '{segment}' under path '{path}'"))),
            }
        }
        Ok(parent_id)
    }

    pub async fn albums(&self, all_albums_path: &str) -> Result<Vec<Album>> {
        self.albums
            .get_or_fetch(|| async {
                let folder_id = self.resolve_path(all_albums_path).await?;
                let children = self.children(&folder_id).await?;
                Ok(children.iter().filter_map(|c| serde_json::from_value(c.clone()).ok()).collect())
            })
            .await
    }

    /// Fetches the "new albums" listing and rebinds each entry to its
    /// all-albums equivalent by matching `(title, creator, date, artist,
    /// genre)`; unmatched entries are kept as-is.
    pub async fn new_albums(&self, new_albums_path: &str, all_albums_path: &str) -> Result<Vec<Album>> {
        self.new_albums
            .get_or_fetch(|| async {
                let folder_id = self.resolve_path(new_albums_path).await?;
                let children = self.children(&folder_id).await?;
                let raw: Vec<Album> = children.iter().filter_map(|c| serde_json::from_value(c.clone()).ok()).collect();

                let all_albums = self.albums(all_albums_path).await?;
                Ok(raw
                    .into_iter()
                    .map(|entry| rebind_to_all_albums(entry, &all_albums))
                    .collect())
            })
            .await
    }

    pub async fn artists(&self, all_artists_path: &str) -> Result<Vec<Artist>> {
        self.artists
            .get_or_fetch(|| async {
                let folder_id = self.resolve_path(all_artists_path).await?;
                let children = self.children(&folder_id).await?;
                Ok(children.iter().filter_map(|c| serde_json::from_value(c.clone()).ok()).collect())
            })
            .await
    }

    /// Derived by iterating every album's children, so each track's
    /// `albumId` is set correctly.
    pub async fn tracks(&self, all_albums_path: &str) -> Result<Vec<Track>> {
        self.tracks
            .get_or_fetch(|| async {
                let albums = self.albums(all_albums_path).await?;
                let mut tracks = Vec::new();
                for album in &albums {
                    let Some(album_id) = &album.id else { continue };
                    let children = self.children(album_id).await?;
                    for child in children {
                        if let Ok(mut track) = serde_json::from_value::<Track>(child) {
                            track.album_id = Some(album_id.clone());
                            tracks.push(track);
                        }
                    }
                }
                Ok(tracks)
            })
            .await
    }

    /// Explicit cache invalidation (REST `POST /media/clear-caches`, per
    /// spec.md's redesign flag on cache invalidation).
    pub fn clear_caches(&self) {
        info!("clearing media server caches");
        self.albums.clear();
        self.new_albums.clear();
        self.artists.clear();
        self.tracks.clear();
        self.metadata.clear();
    }

    /// Finds a track's `MediaId` by `(albumTitle, artist)` + `(album,
    /// trackNumber)`, used by the streamer adapter to enrich queue items
    /// with `albumMediaId`/`trackMediaId`.
    pub async fn find_track_media_id(&self, all_albums_path: &str, album_title: &str, artist: &str, track_number: Option<u32>) -> Option<(MediaId, MediaId)> {
        let albums = self.tracks(all_albums_path).await.ok()?;
        let album = self
            .albums(all_albums_path)
            .await
            .ok()?
            .into_iter()
            .find(|a| a.title.as_deref() == Some(album_title) && a.artist.as_deref() == Some(artist))?;
        let album_id = album.id?;
        let track = albums.into_iter().find(|t| {
            t.album_id.as_deref() == Some(album_id.as_str()) && (track_number.is_none() || t.original_track_number == track_number)
        })?;
        Some((album_id, track.id?))
    }
}

fn rebind_to_all_albums(entry: Album, all_albums: &[Album]) -> Album {
    all_albums
        .iter()
        .find(|candidate| {
            candidate.title == entry.title && candidate.creator == entry.creator && candidate.date == entry.date && candidate.artist == entry.artist && candidate.genre == entry.genre
        })
        .cloned()
        .unwrap_or(entry)
}
