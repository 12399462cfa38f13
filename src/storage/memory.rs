//! In-memory key-value store with optional JSON file persistence
//!
//! Without a persist path this is a plain map. With one, every mutation
//! rewrites the file and construction loads it back. File trouble on the
//! automatic save/load path is logged and tolerated; the store keeps
//! working in memory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value as Json, json};

use crate::error::{Error, Result};
use crate::storage::engine::Store;

const FORMAT_VERSION: &str = "1.0";

/// In-memory store, optionally persisted to a JSON file
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: HashMap<String, Json>,
    persist_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store persisted at the given path, loading an existing
    /// file if one is there
    pub fn with_persistence(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            data: HashMap::new(),
            persist_path: Some(path.into()),
        };
        store.load();
        store
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Writes the current contents to a separate backup file
    pub fn backup(&self, path: impl AsRef<Path>) -> Result<()> {
        write_payload(path.as_ref(), &self.payload())
    }

    /// Replaces the current contents from a backup file and re-saves
    pub fn restore(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let text = fs::read_to_string(path.as_ref())?;
        self.data = parse_payload(&text)?;
        self.save();
        Ok(())
    }

    fn payload(&self) -> Json {
        json!({ "version": FORMAT_VERSION, "data": self.data })
    }

    /// Best-effort save to the persist file; failures are logged
    fn save(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        if let Err(err) = write_payload(path, &self.payload()) {
            tracing::warn!(path = %path.display(), error = %err, "failed to save store");
        }
    }

    /// Best-effort load from the persist file, true if data was loaded
    fn load(&mut self) -> bool {
        let Some(path) = &self.persist_path else {
            return false;
        };
        if !path.exists() {
            return false;
        }
        let parsed = fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|text| parse_payload(&text));
        match parsed {
            Ok(data) => {
                self.data = data;
                true
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to load store");
                false
            }
        }
    }
}

fn write_payload(path: &Path, payload: &Json) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(payload)?)?;
    Ok(())
}

fn parse_payload(text: &str) -> Result<HashMap<String, Json>> {
    let parsed: Json = serde_json::from_str(text)?;
    let data = parsed
        .get("data")
        .and_then(Json::as_object)
        .ok_or_else(|| Error::Storage("invalid store file format".to_string()))?;
    Ok(data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<Json> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Json) -> Result<()> {
        self.data.insert(key.to_string(), value);
        self.save();
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let existed = self.data.remove(key).is_some();
        if existed {
            self.save();
        }
        Ok(existed)
    }

    fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    fn clear(&mut self) -> Result<()> {
        self.data.clear();
        self.save();
        Ok(())
    }
}
