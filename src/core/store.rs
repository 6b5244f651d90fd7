//! Key-value state shared with the app layer.
//!
//! The app owns these values; the daemon only reads and writes them by key.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;

pub mod keys {
    pub const TARGET_PING: &str = "target_ping";
    pub const PREFERRED_WIFI: &str = "preferred_wifi";
    pub const CURRENT_GAME: &str = "current_game";
    pub const PERMISSIONS: &str = "permissions";
    pub const OVERLAY_POSITION: &str = "overlay_position";
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub fn get_parsed<T: FromStr>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    store.get(key).and_then(|v| v.trim().parse().ok())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.map
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

/// TOML-backed store; every write rewrites the file atomically.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    map: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let map = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            map: RwLock::new(map),
        })
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let body = toml::to_string(map).context("Failed to serialize state")?;
        let temp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&temp_path, body).context("Failed to write temporary state file")?;
        std::fs::rename(&temp_path, &self.path).context("Failed to rename state file")?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self
            .map
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        if map.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        map.insert(key.to_string(), value.to_string());
        self.persist(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self
            .map
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }
}
