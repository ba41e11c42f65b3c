//! # Validation Module
//!
//! Input checks applied when a [`LineItem`](crate::item::LineItem) is built,
//! whether by the caller or by rehydration from storage.
//!
//! ## Usage
//! ```rust
//! use cartkit_core::validation::{validate_quantity, validate_price};
//!
//! assert!(validate_quantity(3).is_ok());
//! assert!(validate_quantity(0).is_err());
//! assert!(validate_price(-1.0).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item id. Must not be empty.
///
/// Whitespace is significant: `" "` is a valid id, matching how ids are
/// compared when items are merged.
pub fn validate_item_id(id: &str) -> ValidationResult<()> {
    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    Ok(())
}

/// Validates an item name. Must not be empty.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a unit price.
///
/// ## Rules
/// - Must be finite
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
pub fn validate_price(price: f64) -> ValidationResult<()> {
    validate_amount("price", price)
}

/// Validates a flat per-unit discount. Same rules as [`validate_price`].
pub fn validate_discount(discount: f64) -> ValidationResult<()> {
    validate_amount("discount", discount)
}

/// Validates a quantity at construction time.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// Only construction is checked. `LineItem::add` and `LineItem::update`
/// accept any resulting quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

fn validate_amount(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
