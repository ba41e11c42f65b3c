//! # Storage Module
//!
//! The key-value boundary a [`Cart`](crate::cart::Cart) persists through.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          trait Storage                                  │
//! │                 get / set / remove / clear                              │
//! │                                                                         │
//! │   ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐  │
//! │   │  MemoryStorage   │  │   FileStorage    │  │   Session            │  │
//! │   │  (this module)   │  │ (cartkit-store)  │  │  (cartkit-store)     │  │
//! │   │  HashMap         │  │  JSON document   │  │  per-visitor data    │  │
//! │   └──────────────────┘  └──────────────────┘  └──────────────────────┘  │
//! │                                                                         │
//! │  &mut S and Box<S> are Storage too, so a cart can borrow its backend   │
//! │  while the caller keeps ownership.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde_json::Value;

use crate::error::StorageResult;

// =============================================================================
// Storage Trait
// =============================================================================

/// A synchronous key-value store holding JSON values.
///
/// Implementations decide durability and sharing; the cart only calls
/// `get` once at construction and `set` on save. Errors are propagated to the
/// caller unchanged.
pub trait Storage {
    /// Returns the value stored under `key`, or `None` when absent.
    fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: Value) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> StorageResult<()>;

    /// Removes every key.
    fn clear(&mut self) -> StorageResult<()>;
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn clear(&mut self) -> StorageResult<()> {
        (**self).clear()
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn clear(&mut self) -> StorageResult<()> {
        (**self).clear()
    }
}

// =============================================================================
// Memory Storage
// =============================================================================

/// In-memory storage. Never fails.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<String, Value>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.values.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.values.clear();
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
