//! # cartkit-core: Pure Cart Logic
//!
//! This crate is the **heart** of cartkit. It holds the cart aggregate, the
//! line item entity, the options filter and the storage seam, with zero
//! file or network I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        cartkit Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 cartkit-cli (or any front end)                  │   │
//! │  │        config ──► options    commands ──► cart operations       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cartkit-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  options  │  │   item    │  │   cart    │  │  storage  │  │   │
//! │  │   │  filter   │  │ LineItem  │  │   Cart    │  │   trait   │  │   │
//! │  │   │  defaults │  │ ItemRecord│  │  totals   │  │  memory   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ trait Storage                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              cartkit-store (file, session backends)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`options`] - Cart options and the recursive options filter
//! - [`item`] - Line items and their persisted record shape
//! - [`cart`] - The cart aggregate and its totals
//! - [`storage`] - The storage trait and an in-memory implementation
//! - [`error`] - Domain error types
//! - [`validation`] - Line item input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use cartkit_core::{Cart, LineItem, MemoryStorage, OptionMap, OptionValue};
//!
//! let mut options = OptionMap::new();
//! options.insert("tax".to_string(), OptionValue::from(15));
//!
//! let mut cart = Cart::new(&options, MemoryStorage::new()).unwrap();
//! cart.add(LineItem::new("25", "Item", 100.0).unwrap());
//!
//! assert_eq!(cart.total(), 115.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod item;
pub mod options;
pub mod storage;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{AddMode, Cart, CartTotals};
pub use error::{CartError, CartResult, StorageError, StorageResult, ValidationError};
pub use item::{FieldValue, Fields, ItemField, ItemRecord, LineItem};
pub use options::{CartOptions, OptionMap, OptionValue, ShippingOptions, DEFAULT_CART_NAME};
pub use storage::{MemoryStorage, Storage};
