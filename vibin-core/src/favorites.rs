//! Favorites: a thin persistence layer over the store's `favorites` table.
//! Hydration (resolving `mediaId` to its `Album`/`Track`) happens at read
//! time; per spec.md §3, a record whose media no longer resolves is simply
//! omitted from results, never auto-deleted.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use vibin_config::Store;

use crate::errors::{Result, VibinError};
use crate::mediaserver::MediaServerHandle;
use crate::model::{Favorite, FavoriteMedia, FavoriteType, MediaId};

fn now_seconds() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

pub struct FavoritesManager {
    store: Arc<Store>,
    media_server: Option<MediaServerHandle>,
}

impl FavoritesManager {
    pub fn new(store: Arc<Store>, media_server: Option<MediaServerHandle>) -> Self {
        FavoritesManager { store, media_server }
    }

    fn records(&self) -> Result<Vec<Favorite>> {
        self.store.get_table(vibin_config::tables::FAVORITES).map_err(VibinError::from)
    }

    fn save(&self, records: &[Favorite]) -> Result<()> {
        self.store.set_table(vibin_config::tables::FAVORITES, &records.to_vec()).map_err(VibinError::from)
    }

    /// Lists favorites, optionally restricted to one `FavoriteType`, each
    /// hydrated with its current media. A record is dropped, not errored,
    /// if hydration fails.
    pub async fn list(&self, kind: Option<FavoriteType>) -> Result<Vec<Favorite>> {
        let mut hydrated = Vec::new();
        for mut record in self.records()? {
            if kind.is_some_and(|k| k != record.kind) {
                continue;
            }
            match self.hydrate(&record).await {
                Some(media) => {
                    record.media = Some(media);
                    hydrated.push(record);
                }
                None => continue,
            }
        }
        Ok(hydrated)
    }

    async fn hydrate(&self, record: &Favorite) -> Option<FavoriteMedia> {
        let media_server = self.media_server.as_ref()?;
        let metadata = media_server.metadata(&record.media_id).await.ok()?;
        match record.kind {
            FavoriteType::Track => serde_json::from_value(metadata).ok().map(FavoriteMedia::Track),
            FavoriteType::Album => serde_json::from_value(metadata).ok().map(FavoriteMedia::Album),
        }
    }

    /// Re-favoriting an already-favorited id is a no-op (spec.md §8 R1):
    /// exactly one record survives, with its original `whenFavorited`.
    pub fn add(&self, kind: FavoriteType, media_id: &str) -> Result<()> {
        let mut records = self.records()?;
        if records.iter().any(|r| r.media_id == media_id) {
            return Ok(());
        }
        records.push(Favorite {
            kind,
            media_id: media_id.to_string(),
            when_favorited: Some(now_seconds()),
            media: None,
        });
        self.save(&records)
    }

    pub fn remove(&self, media_id: &MediaId) -> Result<()> {
        let mut records = self.records()?;
        records.retain(|r| &r.media_id != media_id);
        self.save(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_adding_the_same_id_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("vibin.json")).unwrap());
        let manager = FavoritesManager::new(Arc::clone(&store), None);

        manager.add(FavoriteType::Track, "track-1").unwrap();
        manager.add(FavoriteType::Track, "track-1").unwrap();

        let records: Vec<Favorite> = store.get_table(vibin_config::tables::FAVORITES).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn remove_drops_the_matching_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("vibin.json")).unwrap());
        let manager = FavoritesManager::new(Arc::clone(&store), None);

        manager.add(FavoriteType::Album, "album-1").unwrap();
        manager.remove(&"album-1".to_string()).unwrap();

        let records: Vec<Favorite> = store.get_table(vibin_config::tables::FAVORITES).unwrap();
        assert!(records.is_empty());
    }
}
