//! # cartkit-store: Storage Backends
//!
//! Implementations of [`cartkit_core::Storage`] beyond the in-memory one that
//! ships with the core crate.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         cartkit-store                                   │
//! │                                                                         │
//! │   ┌──────────────────────────────┐  ┌──────────────────────────────┐   │
//! │   │          FileStorage         │  │         SessionStore         │   │
//! │   │  one JSON object on disk     │  │  SessionId ──► Session<'_>   │   │
//! │   │  temp file + rename writes   │  │  idle purge by last access   │   │
//! │   └──────────────────────────────┘  └──────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`file`] - JSON document storage
//! - [`session`] - Per-visitor session storage

pub mod file;
pub mod session;

pub use file::FileStorage;
pub use session::{Session, SessionId, SessionStore};
