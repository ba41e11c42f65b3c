//! # Session Store
//!
//! An in-process registry of per-visitor storage, keyed by an opaque
//! [`SessionId`]. Each session owns its own key space, so two visitors can
//! both keep a cart under `"shopping_cart"` without seeing each other.
//!
//! ## Lifecycle
//! ```text
//! start() ──► SessionId ──► session(id) ──► Session<'_> (impl Storage)
//!                  │              │
//!                  │              └── touches last_accessed
//!                  │
//!                  ├── destroy(id)
//!                  └── purge_idle(max_idle, now)  drops idle sessions
//! ```
//!
//! ## Example
//! ```rust
//! use cartkit_core::{Cart, LineItem, OptionMap};
//! use cartkit_store::SessionStore;
//!
//! let mut sessions = SessionStore::new();
//! let id = sessions.start();
//!
//! let mut cart = Cart::new(&OptionMap::new(), sessions.session(id).unwrap()).unwrap();
//! cart.add(LineItem::new("15", "Item", 50.5).unwrap());
//! cart.close().unwrap();
//!
//! let cart = Cart::new(&OptionMap::new(), sessions.session(id).unwrap()).unwrap();
//! assert_eq!(cart.total_items(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use cartkit_core::{MemoryStorage, Storage, StorageError, StorageResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// Session Identifier
// =============================================================================

/// Opaque session identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

// =============================================================================
// Session Store
// =============================================================================

#[derive(Debug)]
struct SessionEntry {
    data: MemoryStorage,
    last_accessed: DateTime<Utc>,
}

/// Registry of live sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, SessionEntry>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new, empty session.
    pub fn start(&mut self) -> SessionId {
        self.start_at(Utc::now())
    }

    /// Starts a new session whose last access is `now`.
    pub fn start_at(&mut self, now: DateTime<Utc>) -> SessionId {
        let id = SessionId::generate();
        self.sessions.insert(
            id,
            SessionEntry {
                data: MemoryStorage::new(),
                last_accessed: now,
            },
        );
        info!(session_id = %id, "Session started");
        id
    }

    /// Opens the storage handle for `id`, marking it accessed now.
    pub fn session(&mut self, id: SessionId) -> StorageResult<Session<'_>> {
        self.session_at(id, Utc::now())
    }

    /// Opens the storage handle for `id`, marking it accessed at `now`.
    ///
    /// ## Errors
    /// `StorageError::SessionNotFound` when the session was never started,
    /// was destroyed, or was purged.
    pub fn session_at(&mut self, id: SessionId, now: DateTime<Utc>) -> StorageResult<Session<'_>> {
        let entry = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| StorageError::SessionNotFound(id.to_string()))?;
        entry.last_accessed = now;
        Ok(Session { id, entry })
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Drops a session and its data. Returns whether it existed.
    pub fn destroy(&mut self, id: SessionId) -> bool {
        let existed = self.sessions.remove(&id).is_some();
        if existed {
            info!(session_id = %id, "Session destroyed");
        }
        existed
    }

    /// Drops every session not accessed within `max_idle` of `now`.
    ///
    /// A session idle for exactly `max_idle` is kept.
    pub fn purge_idle(&mut self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.signed_duration_since(entry.last_accessed) <= max_idle);
        let purged = before - self.sessions.len();

        if purged > 0 {
            info!(purged, remaining = self.sessions.len(), "Purged idle sessions");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =============================================================================
// Session Handle
// =============================================================================

/// Borrowed storage for one session.
#[derive(Debug)]
pub struct Session<'a> {
    id: SessionId,
    entry: &'a mut SessionEntry,
}

impl Session<'_> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.entry.last_accessed
    }
}

impl Storage for Session<'_> {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.entry.data.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult<()> {
        debug!(session_id = %self.id, key, "Session write");
        self.entry.data.set(key, value)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.entry.data.remove(key)
    }

    /// Clears this session's data only.
    fn clear(&mut self) -> StorageResult<()> {
        self.entry.data.clear()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
