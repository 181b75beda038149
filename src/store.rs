use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const SETTINGS_KEY: &str = "settings";

/// Server credentials. One record per installation, last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl Settings {
    /// Reads the persisted record, falling back to empty defaults on first
    /// start when nothing has been saved yet.
    pub fn load(store: &dyn KvStore) -> Result<Self> {
        match store.get(SETTINGS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, store: &dyn KvStore) -> Result<()> {
        store.set(SETTINGS_KEY, &serde_json::to_string(self)?)
    }
}

/// Minimal persisted key-value surface, so the storage mechanism stays
/// swappable and tests never touch the real data directory.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Production store: one JSON object in the platform data directory.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join("store.json"),
        })
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value.to_string());
        fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        info!(key, path = %self.path.display(), "persisted value");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn get_of_missing_key_is_none() {
        let (_dir, store) = store();
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let (_dir, store) = store();
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn settings_load_defaults_when_absent() {
        let (_dir, store) = store();
        assert_eq!(Settings::load(&store).unwrap(), Settings::default());
    }

    #[test]
    fn settings_round_trip() {
        let (_dir, store) = store();
        let settings = Settings {
            url: "http://localhost:7086/webdav".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        settings.save(&store).unwrap();
        assert_eq!(Settings::load(&store).unwrap(), settings);
    }
}
