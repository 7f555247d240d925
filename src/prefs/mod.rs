//! Persisted UI preferences, chiefly the last selected space and zone.
//!
//! Stores are plain string key/value maps. Concurrent writers (two
//! processes sharing one backing file or database) race; the last write wins.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigPaths, PreferenceBackend, PreferenceOptions};

mod file;
mod sqlite;

pub use file::FileStore;
pub use sqlite::SqliteStore;

/// Key holding the serialized [`Selection`].
pub const SELECTION_KEY: &str = "kafuffle.selection";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("accessing preference file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("preference file {} is not a JSON object", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("encoding preferences")]
    Encode(#[from] serde_json::Error),
    #[error("preference database")]
    Sqlite(#[from] rusqlite::Error),
}

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: PreferenceStore + ?Sized> PreferenceStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Process-local store, nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Last selected space and zone, as persisted under [`SELECTION_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Selection {
    pub selected_space_id: Option<String>,
    pub selected_zone_id: Option<String>,
}

/// Typed access to the selection entry of a [`PreferenceStore`].
///
/// Reads never fail: a missing, partial or unreadable entry is reported as
/// "nothing selected". Writes merge into whatever could be read, so
/// updating the zone leaves the stored space alone and vice versa.
pub struct SelectionPrefs<S> {
    store: S,
}

impl<S: PreferenceStore> SelectionPrefs<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn selection(&self) -> Selection {
        let raw = match self.store.get(SELECTION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Selection::default(),
            Err(err) => {
                tracing::warn!(error = %err, "reading stored selection, treating as unset");
                return Selection::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(selection) => selection,
            Err(err) => {
                tracing::warn!(?err, "stored selection is not valid JSON, treating as unset");
                Selection::default()
            }
        }
    }

    pub fn space(&self) -> Option<String> {
        self.selection().selected_space_id
    }

    pub fn zone(&self) -> Option<String> {
        self.selection().selected_zone_id
    }

    pub fn set_space(&self, space_id: Option<&str>) -> Result<(), StoreError> {
        self.update(|selection| selection.selected_space_id = space_id.map(str::to_string))
    }

    pub fn set_zone(&self, zone_id: Option<&str>) -> Result<(), StoreError> {
        self.update(|selection| selection.selected_zone_id = zone_id.map(str::to_string))
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(SELECTION_KEY)
    }

    fn update<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Selection),
    {
        let mut selection = self.selection();
        apply(&mut selection);
        let encoded = serde_json::to_string(&selection)?;
        self.store.set(SELECTION_KEY, &encoded)
    }
}

/// Opens the backend named in the configuration.
pub fn open_store(
    options: &PreferenceOptions,
    paths: &ConfigPaths,
) -> Result<Box<dyn PreferenceStore>, StoreError> {
    let store: Box<dyn PreferenceStore> = match options.backend {
        PreferenceBackend::File => Box::new(FileStore::new(paths.preferences_file.clone())),
        PreferenceBackend::Sqlite => Box::new(SqliteStore::open(paths.preferences_db.clone())?),
        PreferenceBackend::Memory => Box::new(MemoryStore::new()),
    };
    tracing::debug!(backend = %options.backend, "opened preference store");
    Ok(store)
}
