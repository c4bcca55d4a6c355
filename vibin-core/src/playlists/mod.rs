//! Playlist/queue reconciler: owns `StoredPlaylistStatus` and all
//! stored-playlist persistence, keeping the streamer's live queue and the
//! store's notion of "the active playlist" in sync. Grounded on
//! `vibin-config::Store`'s single-document table model and on spec.md
//! §4.6's invariants I1-I3/P2.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use vibin_config::Store;

use crate::errors::{Result, VibinError};
use crate::model::{MediaId, PlaylistId, PlaylistModifyAction, StoredPlaylist, StoredPlaylistStatus, StoredPlaylists, UpdateMessageType};
use crate::streamer::{StreamerHandle, UpdateSink};

fn now_seconds() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

pub struct PlaylistReconciler {
    store: Arc<Store>,
    streamer: StreamerHandle,
    status: RwLock<StoredPlaylistStatus>,
    suppress_queue_updates: AtomicBool,
    updates: UpdateSink,
}

impl PlaylistReconciler {
    pub fn new(store: Arc<Store>, streamer: StreamerHandle, updates: UpdateSink) -> Self {
        PlaylistReconciler {
            store,
            streamer,
            status: RwLock::new(StoredPlaylistStatus::default()),
            suppress_queue_updates: AtomicBool::new(false),
            updates,
        }
    }

    fn playlists(&self) -> Result<Vec<StoredPlaylist>> {
        self.store.get_table(vibin_config::tables::STORED_PLAYLISTS).map_err(VibinError::from)
    }

    fn save_playlists(&self, playlists: &[StoredPlaylist]) -> Result<()> {
        self.store.set_table(vibin_config::tables::STORED_PLAYLISTS, &playlists.to_vec()).map_err(VibinError::from)
    }

    pub fn snapshot(&self) -> Result<StoredPlaylists> {
        Ok(StoredPlaylists {
            status: self.status.read().clone(),
            playlists: self.playlists()?,
        })
    }

    fn emit_snapshot(&self) {
        if let Ok(snapshot) = self.snapshot() {
            (self.updates)(UpdateMessageType::StoredPlaylists, serde_json::to_value(snapshot).unwrap_or_default());
        }
    }

    pub async fn clear_queue(&self) -> Result<()> {
        self.streamer.commands().clear_queue().await?;
        let mut status = self.status.write();
        *status = StoredPlaylistStatus::default();
        drop(status);
        self.emit_snapshot();
        Ok(())
    }

    pub async fn modify_queue(&self, media_id: &str, action: PlaylistModifyAction, track_index: Option<usize>, all_albums_path: &str) -> Result<()> {
        self.streamer
            .commands()
            .modify_queue(self.streamer.media_server(), action, media_id, track_index, all_albums_path)
            .await?;

        if action == PlaylistModifyAction::Replace {
            let mut status = self.status.write();
            status.active_id = None;
            status.is_active_synced_with_store = false;
            drop(status);
            self.emit_snapshot();
        }
        Ok(())
    }

    /// Replaces the active queue with the stored playlist's entries, one
    /// `APPEND` per entry, suppressing `onStreamerQueueModified` churn for
    /// the duration.
    pub async fn activate(&self, playlist_id: &PlaylistId, all_albums_path: &str) -> Result<()> {
        let playlists = self.playlists()?;
        let playlist = playlists
            .iter()
            .find(|p| &p.id == playlist_id)
            .ok_or_else(|| VibinError::NotFound(format!("no stored playlist with id '{playlist_id}'")))?
            .clone();

        self.status.write().is_activating_playlist = true;

        self.streamer.commands().clear_queue().await?;
        self.suppress_queue_updates.store(true, Ordering::SeqCst);

        let activation_result = self.append_all(&playlist.entry_ids, all_albums_path).await;

        self.suppress_queue_updates.store(false, Ordering::SeqCst);

        activation_result?;

        let mut status = self.status.write();
        status.active_id = Some(playlist.id.clone());
        status.is_active_synced_with_store = true;
        status.is_activating_playlist = false;
        drop(status);

        self.emit_snapshot();
        Ok(())
    }

    async fn append_all(&self, entry_ids: &[MediaId], all_albums_path: &str) -> Result<()> {
        for entry_id in entry_ids {
            self.streamer
                .commands()
                .modify_queue(self.streamer.media_server(), PlaylistModifyAction::Append, entry_id, None, all_albums_path)
                .await?;
        }
        Ok(())
    }

    /// If `replace` and an active playlist is set, overwrites its entries in
    /// place; otherwise inserts a new playlist with a fresh id and marks it
    /// active.
    pub fn store_active_as_playlist(&self, name: &str, replace: bool) -> Result<StoredPlaylist> {
        let mut playlists = self.playlists()?;
        let entry_ids = self.streamer.snapshot_queue().track_media_ids().into_iter().flatten().collect::<Vec<_>>();
        let now = now_seconds();

        let active_id = self.status.read().active_id.clone();

        let stored = if replace {
            match active_id.as_ref().and_then(|id| playlists.iter_mut().find(|p| &p.id == id)) {
                Some(existing) => {
                    existing.entry_ids = entry_ids;
                    existing.updated = now;
                    existing.clone()
                }
                None => return Err(VibinError::InputError("no active playlist to replace".to_string())),
            }
        } else {
            let playlist = StoredPlaylist {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                created: now,
                updated: now,
                entry_ids,
            };
            playlists.push(playlist.clone());
            playlist
        };

        self.save_playlists(&playlists)?;

        let mut status = self.status.write();
        status.active_id = Some(stored.id.clone());
        status.is_active_synced_with_store = true;
        drop(status);

        self.emit_snapshot();
        Ok(stored)
    }

    pub fn delete(&self, playlist_id: &PlaylistId) -> Result<()> {
        let mut playlists = self.playlists()?;
        let before = playlists.len();
        playlists.retain(|p| &p.id != playlist_id);
        if playlists.len() == before {
            return Err(VibinError::NotFound(format!("no stored playlist with id '{playlist_id}'")));
        }
        self.save_playlists(&playlists)?;

        let mut status = self.status.write();
        if status.active_id.as_ref() == Some(playlist_id) {
            *status = StoredPlaylistStatus::default();
        }
        drop(status);

        self.emit_snapshot();
        Ok(())
    }

    pub fn update_metadata(&self, playlist_id: &PlaylistId, name: &str) -> Result<StoredPlaylist> {
        let mut playlists = self.playlists()?;
        let playlist = playlists
            .iter_mut()
            .find(|p| &p.id == playlist_id)
            .ok_or_else(|| VibinError::NotFound(format!("no stored playlist with id '{playlist_id}'")))?;
        playlist.name = name.to_string();
        playlist.updated = now_seconds();
        let updated = playlist.clone();

        self.save_playlists(&playlists)?;
        self.emit_snapshot();
        Ok(updated)
    }

    /// If the current queue's `trackMediaId` sequence exactly matches a
    /// stored playlist's `entryIds`, selects the most recently updated such
    /// match as the active playlist.
    pub fn check_on_startup(&self) -> Result<()> {
        let playlists = self.playlists()?;
        let current_ids: Vec<MediaId> = self.streamer.snapshot_queue().track_media_ids().into_iter().flatten().collect();

        let best_match = playlists.iter().filter(|p| p.entry_ids == current_ids).max_by(|a, b| a.updated.total_cmp(&b.updated));

        if let Some(playlist) = best_match {
            let mut status = self.status.write();
            status.active_id = Some(playlist.id.clone());
            status.is_active_synced_with_store = true;
            drop(status);
            self.emit_snapshot();
        }
        Ok(())
    }

    /// Hot path invoked whenever the streamer reports a new queue. Skipped
    /// entirely while `activate()` is mid-flight (suppress flag set).
    pub fn on_streamer_queue_modified(&self, track_media_ids: &[Option<MediaId>]) -> Result<()> {
        if self.suppress_queue_updates.load(Ordering::SeqCst) {
            return Ok(());
        }

        let active_id = self.status.read().active_id.clone();
        let Some(active_id) = active_id else {
            return Ok(());
        };

        let playlists = self.playlists()?;
        let Some(playlist) = playlists.iter().find(|p| p.id == active_id) else {
            return Ok(());
        };

        let current: Vec<MediaId> = track_media_ids.iter().cloned().flatten().collect();
        let synced = playlist.entry_ids == current;

        let mut status = self.status.write();
        if status.is_active_synced_with_store != synced {
            status.is_active_synced_with_store = synced;
            drop(status);
            self.emit_snapshot();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_seconds_is_monotonic_increasing_with_real_clock() {
        let a = now_seconds();
        let b = now_seconds();
        assert!(b >= a);
    }
}
