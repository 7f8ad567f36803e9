// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Persistent string key-value storage shared by the session and the
//! response cache.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove_item(&self, key: &str) -> io::Result<()>;
    fn keys(&self) -> Vec<String>;

    fn clear(&self) -> io::Result<()> {
        for key in self.keys() {
            self.remove_item(&key)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredItem {
    key: String,
    value: String,
}

/// One JSON file per key inside a directory.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    // Serialises writers within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn open<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        debug!("Opened storage at {}", dir.display());
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("iptv-client").join("storage"))
    }

    fn item_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = format!("{:x}", hasher.finalize())[..16].to_string();
        self.dir.join(format!("{}.json", hash))
    }

    fn read_item(path: &Path) -> Option<StoredItem> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Ignoring unreadable storage file {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().ok()?;
        Self::read_item(&self.item_path(key))
            .filter(|item| item.key == key)
            .map(|item| item.value)
    }

    fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| io::Error::other("storage lock poisoned"))?;
        let item = StoredItem {
            key: key.to_string(),
            value: value.to_string(),
        };
        let content = serde_json::to_string(&item)?;
        fs::write(self.item_path(key), content)
    }

    fn remove_item(&self, key: &str) -> io::Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| io::Error::other("storage lock poisoned"))?;
        let path = self.item_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        let Ok(_guard) = self.lock.lock() else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| Self::read_item(&path))
            .map(|item| item.key)
            .collect()
    }
}

/// Process-local storage, used when nothing should touch the disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
        self.items
            .lock()
            .map_err(|_| io::Error::other("storage lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> io::Result<()> {
        self.items
            .lock()
            .map_err(|_| io::Error::other("storage lock poisoned"))?
            .remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.items
            .lock()
            .map(|items| items.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = FileStorage::open(dir.path()).unwrap();
            storage.set_item("token", "abc123").unwrap();
        }
        let storage = FileStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get_item("token").as_deref(), Some("abc123"));
        assert_eq!(storage.keys(), vec!["token".to_string()]);
    }

    #[test]
    fn clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        storage.clear().unwrap();
        assert!(storage.get_item("a").is_none());
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn memory_storage_remove() {
        let storage = MemoryStorage::new();
        storage.set_item("k", "v").unwrap();
        storage.remove_item("k").unwrap();
        assert!(storage.get_item("k").is_none());
    }
}
