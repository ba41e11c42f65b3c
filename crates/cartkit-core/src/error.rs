//! # Error Types
//!
//! Domain-specific error types for cartkit-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cartkit-core errors (this file)                                        │
//! │  ├── CartError        - Everything a cart operation can fail with       │
//! │  ├── ValidationError  - Line item construction failures                 │
//! │  └── StorageError     - Failures reported by a Storage backend          │
//! │                                                                         │
//! │  Flow: ValidationError ─┐                                               │
//! │                         ├──► CartError ──► caller                       │
//! │        StorageError ────┘                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, key, path)
//! 3. Errors are enum variants, never String
//! 4. Malformed *persisted* records are recovered during load and never
//!    surface here; only construction by the caller does

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Cart Error
// =============================================================================

/// Errors returned by cart and line item operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Structurally invalid input to a line item constructor.
    ///
    /// ## When This Occurs
    /// - Empty id or name
    /// - Negative price or discount
    /// - Quantity of zero or less
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// An option key outside the canonical set was requested.
    ///
    /// The option set is fixed, so this points at a programming error in
    /// the caller rather than bad user input.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// A stored record could not be turned into a line item at all.
    ///
    /// ## When This Occurs
    /// - The record is not an object
    /// - The record has no usable id or name
    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },

    /// The storage backend failed; propagated unchanged, never retried.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Line item validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly greater than zero.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must be greater than or equal to zero")]
    MustBeNonNegative { field: String },

    /// Value is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },
}

// =============================================================================
// Storage Error
// =============================================================================

/// Errors reported by [`Storage`](crate::storage::Storage) implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed (file backends).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded as JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing document exists but does not have the expected shape.
    #[error("Corrupt storage at {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// A session handle was requested for an unknown or expired session.
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CartError.
pub type CartResult<T> = Result<T, CartError>;

/// Convenience type alias for Results with StorageError.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Unit Tests
// =============================================================================
