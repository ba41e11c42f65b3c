//! # File Storage
//!
//! Persists every key as an entry of one JSON object on disk.
//!
//! ## On-Disk Layout
//! ```text
//! cart.json
//! {
//!   "shopping_cart": {
//!     "15": { "id": "15", "name": "Item", "price": 50.5, "qty": 2, ... }
//!   },
//!   "wishlist": { ... }
//! }
//! ```
//!
//! ## Write Path
//! ```text
//! set / remove / clear
//!      │
//!      ▼
//! stage a copy of the document
//!      │
//!      ▼
//! write cart.json.tmp ──► rename over cart.json ──► adopt staged copy
//! ```
//! The rename keeps a crash mid-write from leaving a half-written document,
//! and a failed write leaves the in-memory document untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cartkit_core::{Storage, StorageError, StorageResult};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Storage backed by a single JSON document.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    document: Map<String, Value>,
}

impl FileStorage {
    /// Opens (or prepares to create) the document at `path`.
    ///
    /// ## Behavior
    /// - Missing parent directories are created
    /// - A missing or blank file starts an empty document
    /// - Invalid JSON fails with `StorageError::Serialization`
    /// - Valid JSON that is not an object fails with `StorageError::Corrupt`
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let document = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => match serde_json::from_str::<Value>(&contents)? {
                Value::Object(document) => document,
                _ => {
                    return Err(StorageError::Corrupt {
                        path,
                        reason: "top-level value is not an object".to_string(),
                    })
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(err) => return Err(err.into()),
        };

        info!(?path, keys = document.len(), "Opened file storage");
        Ok(FileStorage { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `staged` to disk and adopts it as the document once the
    /// rename succeeds. On failure the previous document stays in place.
    fn commit(&mut self, staged: Map<String, Value>) -> StorageResult<()> {
        let contents = serde_json::to_string_pretty(&staged)?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, contents)?;
        fs::rename(&staging, &self.path)?;

        self.document = staged;
        debug!(path = ?self.path, keys = self.document.len(), "Flushed file storage");
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.document.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult<()> {
        let mut staged = self.document.clone();
        staged.insert(key.to_string(), value);
        self.commit(staged)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        if !self.document.contains_key(key) {
            return Ok(());
        }
        let mut staged = self.document.clone();
        staged.remove(key);
        self.commit(staged)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.commit(Map::new())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cartkit_core::{Cart, LineItem, OptionMap};
    use serde_json::json;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("nested/cart.json")).unwrap();

        assert_eq!(storage.get("shopping_cart").unwrap(), None);
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");

        let mut storage = FileStorage::open(&path).unwrap();
        storage.set("name", json!("my_cart")).unwrap();
        storage.set("total", json!(34.56)).unwrap();
        storage.set("fields", json!([{"id": 16}, {"id": 1256}])).unwrap();
        storage.remove("fields").unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("name").unwrap(), Some(json!("my_cart")));
        assert_eq!(reopened.get("total").unwrap(), Some(json!(34.56)));
        assert_eq!(reopened.get("fields").unwrap(), None);
    }

    #[test]
    fn test_clear_empties_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");

        let mut storage = FileStorage::open(&path).unwrap();
        storage.set("a", json!(1)).unwrap();
        storage.clear().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&contents).unwrap(), json!({}));
    }

    #[test]
    fn test_blank_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        fs::write(&path, "  \n").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("anything").unwrap(), None);
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{not json").unwrap();
        assert!(matches!(
            FileStorage::open(&garbage),
            Err(StorageError::Serialization(_))
        ));

        let list = dir.path().join("list.json");
        fs::write(&list, "[1, 2, 3]").unwrap();
        assert!(matches!(
            FileStorage::open(&list),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_cart_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            let mut cart = Cart::new(&OptionMap::new(), storage).unwrap();
            cart.add(LineItem::new("15", "Item", 50.5).unwrap());
            cart.add(LineItem::new("15", "Item", 50.5).unwrap());
            cart.close().unwrap();
        }

        let cart = Cart::new(&OptionMap::new(), FileStorage::open(&path).unwrap()).unwrap();
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.total(), 101.0);
    }

    #[test]
    fn test_failed_write_leaves_document_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");

        let mut storage = FileStorage::open(&path).unwrap();
        storage.set("kept", json!(1)).unwrap();

        // A directory in the staging slot makes every write fail
        fs::create_dir(dir.path().join("cart.json.tmp")).unwrap();

        assert!(storage.set("k", json!(1)).is_err());
        assert_eq!(storage.get("k").unwrap(), None);

        assert!(storage.remove("kept").is_err());
        assert!(storage.clear().is_err());
        assert_eq!(storage.get("kept").unwrap(), Some(json!(1)));

        // Once writes work again, the failed value is not persisted
        fs::remove_dir(dir.path().join("cart.json.tmp")).unwrap();
        storage.set("other", json!(2)).unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap(), None);
        assert_eq!(reopened.get("kept").unwrap(), Some(json!(1)));
        assert_eq!(reopened.get("other").unwrap(), Some(json!(2)));
    }
}
