//! A single small JSON document used as a key/value store for the handful
//! of things vibin persists across restarts: settings, favorites, stored
//! playlists, a lyrics cache, and a links cache. Reads take a shared lock;
//! writes take an exclusive lock and are flushed to disk with a
//! write-to-temp-then-rename so a crash mid-write can never corrupt the
//! document on disk.

mod store;

pub use store::{Store, StoreError};

/// Names of the top-level tables the store recognizes. Any other table name
/// is still usable (the document is just a JSON object), but these are the
/// ones vibin-core actually reads and writes.
pub mod tables {
    pub const SETTINGS: &str = "settings";
    pub const FAVORITES: &str = "favorites";
    pub const STORED_PLAYLISTS: &str = "stored_playlists";
    pub const LYRICS: &str = "lyrics";
    pub const LINKS: &str = "links";
}
