use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read store file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse store file {path} as JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write store file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("table {0} does not hold a JSON object")]
    NotAnObject(String),
    #[error("failed to (de)serialize value for table {table}: {source}")]
    Serde {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The persisted document: one JSON object whose top-level keys are table
/// names. Every read goes through a shared lock; every write takes the
/// exclusive lock for the duration of serializing and fsyncing to disk, so
/// concurrent writers are fully serialized.
pub struct Store {
    path: PathBuf,
    data: RwLock<Value>,
}

impl Store {
    /// Loads the store from `path`, creating an empty document (and its
    /// parent directory) if none exists yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: path.clone(),
                    source,
                })?;
            }
        }

        let data = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "store file not found, starting empty");
                Value::Object(Map::new())
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.clone(),
                    source,
                });
            }
        };

        let store = Store {
            path,
            data: RwLock::new(data),
        };
        store.flush()?;
        Ok(store)
    }

    /// Returns the deserialized contents of `table`, or `T::default()` if
    /// the table is absent.
    pub fn get_table<T>(&self, table: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        let data = self.data.read();
        match data.get(table) {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|source| StoreError::Serde {
                    table: table.to_string(),
                    source,
                })
            }
            None => Ok(T::default()),
        }
    }

    /// Replaces `table` wholesale with the serialized form of `value` and
    /// flushes to disk.
    pub fn set_table<T: Serialize>(&self, table: &str, value: &T) -> Result<(), StoreError> {
        let serialized = serde_json::to_value(value).map_err(|source| StoreError::Serde {
            table: table.to_string(),
            source,
        })?;

        {
            let mut data = self.data.write();
            let root = data.as_object_mut().expect("document root is always an object");
            root.insert(table.to_string(), serialized);
        }

        self.flush()
    }

    /// Gets a single key out of a table's object, without deserializing the
    /// whole table.
    pub fn get_value(&self, table: &str, key: &str) -> Option<Value> {
        let data = self.data.read();
        data.get(table)?.get(key).cloned()
    }

    /// Sets a single key within a table, creating the table if absent.
    pub fn set_value(&self, table: &str, key: &str, value: Value) -> Result<(), StoreError> {
        {
            let mut data = self.data.write();
            let root = data.as_object_mut().expect("document root is always an object");
            let table_entry = root
                .entry(table.to_string())
                .or_insert_with(|| Value::Object(Map::new()));

            let table_obj = table_entry
                .as_object_mut()
                .ok_or_else(|| StoreError::NotAnObject(table.to_string()))?;
            table_obj.insert(key.to_string(), value);
        }

        self.flush()
    }

    pub fn remove_value(&self, table: &str, key: &str) -> Result<(), StoreError> {
        {
            let mut data = self.data.write();
            if let Some(table_obj) = data.get_mut(table).and_then(|v| v.as_object_mut()) {
                table_obj.remove(key);
            }
        }
        self.flush()
    }

    /// Write-to-temp-then-rename so a crash mid-write never leaves a
    /// truncated or half-written document on disk.
    fn flush(&self) -> Result<(), StoreError> {
        let data = self.data.read();
        let serialized = serde_json::to_vec_pretty(&*data).expect("Value serialization cannot fail");
        drop(data);

        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir),
            None => tempfile::NamedTempFile::new(),
        }
        .map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        tmp.write_all(&serialized).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        tmp.flush().map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        tmp.persist(&self.path).map_err(|err| StoreError::Write {
            path: self.path.clone(),
            source: err.error,
        })?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full persisted document, for diagnostics (`GET /vibin/db`).
    pub fn dump(&self) -> Value {
        self.data.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Favorite {
        media_id: String,
        kind: String,
    }

    #[test]
    fn round_trips_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("vibin.json")).unwrap();

        let favorites = vec![Favorite {
            media_id: "abc123".into(),
            kind: "album".into(),
        }];
        store.set_table("favorites", &favorites).unwrap();

        let reopened = Store::open(dir.path().join("vibin.json")).unwrap();
        let loaded: Vec<Favorite> = reopened.get_table("favorites").unwrap();
        assert_eq!(loaded, favorites);
    }

    #[test]
    fn missing_table_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("vibin.json")).unwrap();
        let loaded: Vec<Favorite> = store.get_table("favorites").unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn set_and_get_individual_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("vibin.json")).unwrap();

        store
            .set_value("lyrics", "track-1", Value::String("la la la".into()))
            .unwrap();
        assert_eq!(
            store.get_value("lyrics", "track-1"),
            Some(Value::String("la la la".into()))
        );

        store.remove_value("lyrics", "track-1").unwrap();
        assert_eq!(store.get_value("lyrics", "track-1"), None);
    }

    #[test]
    fn survives_preexisting_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vibin.json");
        fs::write(&path, b"{}").unwrap();

        let store = Store::open(&path).unwrap();
        let loaded: Vec<Favorite> = store.get_table("favorites").unwrap();
        assert!(loaded.is_empty());
    }
}
