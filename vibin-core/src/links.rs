//! Links: a cache over the store's `links` table, backed by an injected
//! external artist/album link provider (e.g. Discogs). Registered only
//! when `DISCOGS_ACCESS_TOKEN` is present, per spec.md §6.

use std::sync::Arc;

use vibin_config::Store;

use crate::errors::{Result, VibinError};
use crate::model::{ExternalServiceLink, Links, MediaId};

pub trait LinksProvider: Send + Sync {
    fn lookup(&self, artist: &str, album: Option<&str>) -> Result<Vec<ExternalServiceLink>>;
}

pub struct LinksManager {
    store: Arc<Store>,
    provider: Option<Arc<dyn LinksProvider>>,
}

impl LinksManager {
    pub fn new(store: Arc<Store>, provider: Option<Arc<dyn LinksProvider>>) -> Self {
        LinksManager { store, provider }
    }

    pub fn from_env(store: Arc<Store>, make_provider: impl FnOnce(String) -> Arc<dyn LinksProvider>) -> Self {
        let provider = std::env::var("DISCOGS_ACCESS_TOKEN").ok().map(make_provider);
        LinksManager { store, provider }
    }

    pub fn cached(&self, media_id: &MediaId) -> Option<Links> {
        self.store.get_value(vibin_config::tables::LINKS, media_id).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Cache-or-fetch, same degrade-to-empty contract as `LyricsManager`:
    /// provider failures never fail the caller, only log.
    pub fn get_or_fetch(&self, media_id: &MediaId, artist: &str, album: Option<&str>) -> Result<Links> {
        if let Some(cached) = self.cached(media_id) {
            return Ok(cached);
        }

        let Some(provider) = &self.provider else {
            return Ok(Links { media_id: Some(media_id.clone()), links: Default::default() });
        };

        let fetched = match provider.lookup(artist, album) {
            Ok(links) => links,
            Err(err) => {
                tracing::warn!(%err, "links provider lookup failed, degrading to empty links");
                Vec::new()
            }
        };

        let mut by_type: std::collections::HashMap<String, Vec<ExternalServiceLink>> = std::collections::HashMap::new();
        for link in fetched {
            by_type.entry(link.kind.clone()).or_default().push(link);
        }
        let result = Links { media_id: Some(media_id.clone()), links: by_type };

        let value = serde_json::to_value(&result).map_err(|err| VibinError::Internal(err.to_string()))?;
        self.store.set_value(vibin_config::tables::LINKS, media_id, value).map_err(VibinError::from)?;
        Ok(result)
    }
}
