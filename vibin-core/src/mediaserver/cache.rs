//! The media-server adapter's two cache shapes: a lazy, explicit-clear-only
//! collection cache (albums/newAlbums/artists/tracks) and a short-TTL
//! per-id metadata cache that sweeps expired entries on each miss.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;

use crate::errors::Result;

pub struct CollectionCache<T> {
    entries: RwLock<Option<Vec<T>>>,
}

impl<T: Clone> CollectionCache<T> {
    pub fn new() -> Self {
        CollectionCache { entries: RwLock::new(None) }
    }

    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Vec<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        if let Some(cached) = self.entries.read().clone() {
            return Ok(cached);
        }

        let fetched = fetch().await?;
        *self.entries.write() = Some(fetched.clone());
        Ok(fetched)
    }

    pub fn clear(&self) {
        *self.entries.write() = None;
    }
}

struct MetadataEntry {
    value: Value,
    inserted_at: Instant,
}

pub struct MetadataCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, MetadataEntry>>,
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        MetadataCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        let entries = self.entries.read();
        let entry = entries.get(id)?;
        if entry.inserted_at.elapsed() > self.ttl {
            None
        } else {
            Some(entry.value.clone())
        }
    }

    pub fn insert(&self, id: String, value: Value) {
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
        entries.insert(id, MetadataEntry { value, inserted_at: Instant::now() });
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
