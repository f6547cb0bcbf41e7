use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Durable string key-value storage, one JSON file per key.
///
/// Reads always go to disk, so a value written by another process is seen
/// on the next read. There is no locking; the last writer wins.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: Arc<PathBuf>,
}

impl LocalStorage {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.exists() {
            std::fs::create_dir_all(root)
                .with_context(|| format!("Failed to create storage dir {}", root.display()))?;
        }

        Ok(Self {
            root: Arc::new(root.to_path_buf()),
        })
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {key}"))?;
        match serde_json::from_str::<String>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!("Ignoring unreadable storage entry {}: {}", key, err);
                Ok(None)
            }
        }
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let encoded = serde_json::to_string(value)?;
        std::fs::write(&path, encoded).with_context(|| format!("Failed to write {key}"))?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| format!("Failed to delete {key}"))?;
        }
        Ok(())
    }

    /// Decode a JSON document stored as a string value. Malformed documents
    /// read as absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_item(key)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!("Stored {} is not valid JSON: {}", key, err);
                Ok(None)
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, &raw)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        id: i64,
    }

    #[test]
    fn test_item_lifecycle() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();

        assert_eq!(storage.get_item("token").unwrap(), None);
        storage.set_item("token", "abc").unwrap();
        assert_eq!(storage.get_item("token").unwrap().as_deref(), Some("abc"));

        storage.remove_item("token").unwrap();
        assert_eq!(storage.get_item("token").unwrap(), None);
        storage.remove_item("token").unwrap();
    }

    #[test]
    fn test_creates_missing_root() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = LocalStorage::open(&nested).unwrap();
        storage.set_item("k", "v").unwrap();
        assert!(nested.join("k.json").exists());
    }

    #[test]
    fn test_json_values_and_corruption() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();

        storage.set_json("user", &Sample { id: 4 }).unwrap();
        assert_eq!(storage.get_json::<Sample>("user").unwrap(), Some(Sample { id: 4 }));

        storage.set_item("user", "{not json").unwrap();
        assert_eq!(storage.get_json::<Sample>("user").unwrap(), None);

        std::fs::write(dir.path().join("user.json"), "garbage").unwrap();
        assert_eq!(storage.get_item("user").unwrap(), None);
    }

    #[test]
    fn test_writes_from_another_handle_are_visible() {
        let dir = TempDir::new().unwrap();
        let first = LocalStorage::open(dir.path()).unwrap();
        let second = LocalStorage::open(dir.path()).unwrap();

        first.set_item("token", "one").unwrap();
        assert_eq!(second.get_item("token").unwrap().as_deref(), Some("one"));
    }
}
