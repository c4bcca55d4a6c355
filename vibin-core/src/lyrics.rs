//! Lyrics: a cache over the store's `lyrics` table, backed by an injected
//! external search provider (the Genius API is an out-of-scope external
//! collaborator per spec.md §1; this module only owns the cache and the
//! provider seam). A provider is registered only when `GENIUS_ACCESS_TOKEN`
//! is set, per spec.md §6's environment-variable gating.

use std::sync::Arc;

use regex::Regex;
use vibin_config::Store;

use crate::errors::{Result, VibinError};
use crate::model::{Lyrics, MediaId};

/// An external lyrics search service. Implemented outside this crate; see
/// spec.md §1's "third-party enrichment services" carve-out.
pub trait LyricsProvider: Send + Sync {
    fn search(&self, artist: &str, title: &str) -> Result<Option<Lyrics>>;
}

pub struct LyricsManager {
    store: Arc<Store>,
    provider: Option<Arc<dyn LyricsProvider>>,
}

impl LyricsManager {
    pub fn new(store: Arc<Store>, provider: Option<Arc<dyn LyricsProvider>>) -> Self {
        LyricsManager { store, provider }
    }

    /// Registers a provider only if `GENIUS_ACCESS_TOKEN` is present in the
    /// environment; otherwise lyrics lookups degrade to cache-only.
    pub fn from_env(store: Arc<Store>, make_provider: impl FnOnce(String) -> Arc<dyn LyricsProvider>) -> Self {
        let provider = std::env::var("GENIUS_ACCESS_TOKEN").ok().map(make_provider);
        LyricsManager { store, provider }
    }

    pub fn cached(&self, media_id: &MediaId) -> Option<Lyrics> {
        self.store.get_value(vibin_config::tables::LYRICS, media_id).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Returns cached lyrics if present; otherwise asks the provider (if
    /// registered) and caches a successful result. Provider failures
    /// degrade to `Ok(None)` rather than propagating (spec.md §7).
    pub fn get_or_fetch(&self, media_id: &MediaId, artist: &str, title: &str) -> Result<Option<Lyrics>> {
        if let Some(cached) = self.cached(media_id) {
            return Ok(Some(cached));
        }

        let Some(provider) = &self.provider else {
            return Ok(None);
        };

        match provider.search(artist, title) {
            Ok(Some(lyrics)) => {
                let value = serde_json::to_value(&lyrics).map_err(|err| VibinError::Internal(err.to_string()))?;
                self.store.set_value(vibin_config::tables::LYRICS, media_id, value).map_err(VibinError::from)?;
                Ok(Some(lyrics))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                tracing::warn!(%err, "lyrics provider search failed, degrading to no lyrics");
                Ok(None)
            }
        }
    }

    /// Searches cached lyric lines by a user-supplied regex. Pattern
    /// complexity is not bounded here (spec.md §9 open question); callers
    /// in front of untrusted input should apply their own limits.
    pub fn search_cached(&self, media_id: &MediaId, pattern: &str) -> Result<Vec<String>> {
        let Some(lyrics) = self.cached(media_id) else {
            return Ok(Vec::new());
        };
        let re = Regex::new(pattern).map_err(|err| VibinError::InputError(format!("invalid lyrics search pattern: {err}")))?;

        Ok(lyrics
            .chunks
            .iter()
            .flat_map(|chunk| chunk.body.iter().flatten())
            .filter(|line| re.is_match(line))
            .cloned()
            .collect())
    }
}
