use serde_json::Value as Json;

use crate::error::Result;

/// Abstract persistence interface (JSON key-value operations)
///
/// The core serializes database snapshots through this trait; anything
/// that can hold JSON values under string keys can back it.
pub trait Store {
    /// Returns the stored value, or None if the key doesn't exist
    fn get(&self, key: &str) -> Option<Json>;

    fn set(&mut self, key: &str, value: Json) -> Result<()>;

    /// Removes a key, returning whether it existed
    fn delete(&mut self, key: &str) -> Result<bool>;

    fn contains(&self, key: &str) -> bool;

    fn keys(&self) -> Vec<String>;

    fn clear(&mut self) -> Result<()>;
}
