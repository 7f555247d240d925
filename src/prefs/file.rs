use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{PreferenceStore, StoreError};

const TMP_EXTENSION: &str = "json.tmp";

/// Preferences kept as a single JSON object on disk.
///
/// Every write reads the whole object, changes one key and replaces the
/// file through a temporary sibling and a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Like `read_entries`, but a corrupt file is discarded so that the next
    /// write starts from an empty object.
    fn read_entries_for_write(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match self.read_entries() {
            Err(StoreError::Corrupt { path, source }) => {
                tracing::warn!(?source, "overwriting corrupt preference file {}", path.display());
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(entries)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let tmp_path = self.path.with_extension(TMP_EXTENSION);
        fs::write(&tmp_path, &json).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.read_entries_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.read_entries_for_write()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{SelectionPrefs, SELECTION_KEY};
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_empty() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = FileStore::new(temp.path().join("prefs.json"));
        assert_eq!(store.get("anything")?, None);
        Ok(())
    }

    #[test]
    fn values_survive_reopening() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("nested").join("prefs.json");
        {
            let prefs = SelectionPrefs::new(FileStore::new(path.clone()));
            prefs.set_zone(Some("z1"))?;
            prefs.set_space(Some("s1"))?;
        }
        let prefs = SelectionPrefs::new(FileStore::new(path.clone()));
        assert_eq!(prefs.zone().as_deref(), Some("z1"));
        assert_eq!(prefs.space().as_deref(), Some("s1"));
        assert!(!path.with_extension(TMP_EXTENSION).exists());
        Ok(())
    }

    #[test]
    fn unrelated_keys_are_kept() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = FileStore::new(temp.path().join("prefs.json"));
        store.set("theme", "dark")?;
        SelectionPrefs::new(store.clone()).set_space(Some("s1"))?;
        assert_eq!(store.get("theme")?.as_deref(), Some("dark"));
        assert!(store.get(SELECTION_KEY)?.is_some());
        Ok(())
    }

    #[test]
    fn corrupt_file_is_reported_but_selection_reads_as_unset() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("prefs.json");
        fs::write(&path, "[1, 2")?;
        let store = FileStore::new(path);
        assert_matches!(store.get(SELECTION_KEY), Err(StoreError::Corrupt { .. }));

        let prefs = SelectionPrefs::new(store);
        assert_eq!(prefs.zone(), None);
        prefs.set_zone(Some("z3"))?;
        assert_eq!(prefs.zone().as_deref(), Some("z3"));
        Ok(())
    }

    #[test]
    fn remove_drops_only_the_key() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = FileStore::new(temp.path().join("prefs.json"));
        store.set("a", "1")?;
        store.set("b", "2")?;
        store.remove("a")?;
        store.remove("missing")?;
        assert_eq!(store.get("a")?, None);
        assert_eq!(store.get("b")?.as_deref(), Some("2"));
        Ok(())
    }
}
