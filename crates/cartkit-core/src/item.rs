//! # Line Item Module
//!
//! One priced, quantified entry in a cart.
//!
//! ## Price Math
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  unit price ── discount ──► net price ── × quantity ──► line total      │
//! │                                                                         │
//! │  Example: price 15, discount 10, qty 3                                  │
//! │           net price = 15 - 10 = 5                                       │
//! │           total     = 5 × 3    = 15                                     │
//! │                                                                         │
//! │  The discount is flat and per unit: it comes off the unit price once,   │
//! │  before the quantity multiplies it.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! `id` and `name` are fixed at construction. Quantity changes only through
//! [`LineItem::add`] and [`LineItem::update`]; price and discount never
//! change once the item exists.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::{CartError, CartResult};
use crate::options::OptionValue;
use crate::validation::{
    validate_discount, validate_item_id, validate_item_name, validate_price, validate_quantity,
};

/// Free-form extension data attached to an item.
pub type Fields = Map<String, Value>;

// =============================================================================
// Item Record
// =============================================================================

/// The persisted shape of a line item.
///
/// This is exactly what a cart writes to storage, one record per item,
/// keyed by item id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    /// Unit price before discount.
    pub price: f64,
    #[ts(type = "number")]
    pub qty: i64,
    pub discount: f64,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub fields: Fields,
}

// =============================================================================
// Field Access
// =============================================================================

/// Names an attribute of a [`LineItem`] for [`LineItem::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField<'a> {
    Id,
    Name,
    /// The stored unit price, not the net price.
    Price,
    Qty,
    Discount,
    /// A key in the extension fields.
    Extension(&'a str),
}

impl<'a> ItemField<'a> {
    /// Maps a record key to a field.
    ///
    /// `"fields"` is not a core attribute: it resolves to an extension
    /// lookup like any other unknown name.
    pub fn parse(name: &'a str) -> Self {
        match name {
            "id" => ItemField::Id,
            "name" => ItemField::Name,
            "price" => ItemField::Price,
            "qty" => ItemField::Qty,
            "discount" => ItemField::Discount,
            other => ItemField::Extension(other),
        }
    }
}

impl<'a> From<&'a str> for ItemField<'a> {
    fn from(name: &'a str) -> Self {
        ItemField::parse(name)
    }
}

/// A value read through [`LineItem::get`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Quantity(i64),
    Extension(&'a Value),
}

impl<'a> FieldValue<'a> {
    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Extension(value) => value.as_str(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Number(n) => Some(n),
            FieldValue::Extension(value) => value.as_f64(),
            _ => None,
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A priced, quantified cart entry identified by a stable id.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    id: String,
    name: String,
    price: f64,
    quantity: i64,
    discount: f64,
    fields: Fields,
}

impl LineItem {
    /// Creates an item with quantity 1, no discount and no extension fields.
    ///
    /// ## Example
    /// ```rust
    /// use cartkit_core::item::LineItem;
    ///
    /// let item = LineItem::new("1", "Item", 15.0).unwrap();
    /// assert_eq!(item.total(), 15.0);
    /// assert!(LineItem::new("", "Item", 15.0).is_err());
    /// ```
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> CartResult<Self> {
        Self::with_details(id, name, price, 1, Fields::new(), 0.0)
    }

    /// Creates an item with every attribute specified.
    ///
    /// ## Errors
    /// `CartError::InvalidArgument` when id or name is empty, price or
    /// discount is negative or not finite, or quantity is zero or less.
    pub fn with_details(
        id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        quantity: i64,
        fields: Fields,
        discount: f64,
    ) -> CartResult<Self> {
        let id = id.into();
        let name = name.into();

        validate_item_id(&id)?;
        validate_item_name(&name)?;
        validate_price(price)?;
        validate_quantity(quantity)?;
        validate_discount(discount)?;

        Ok(LineItem {
            id,
            name,
            price,
            quantity,
            discount,
            fields,
        })
    }

    /// Rebuilds an item from a stored record, tolerating bad field types.
    ///
    /// ## Recovery Rules
    /// | Key | Accepted | Fallback |
    /// |-----|----------|----------|
    /// | `id` | string, integer | record rejected |
    /// | `name` | string | record rejected |
    /// | `price`, `discount` | number, numeric string | `0.0` |
    /// | `qty` | integer, integral string | `1` |
    /// | `fields` | object | empty |
    ///
    /// The recovered values still go through normal validation, so an empty
    /// id or a negative price rejects the record.
    pub fn from_stored(record: &Value) -> CartResult<Self> {
        let Some(entries) = record.as_object() else {
            return Err(malformed("record is not an object"));
        };

        let id = match entries.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) if id.is_i64() || id.is_u64() => id.to_string(),
            _ => return Err(malformed("id is missing or not a string")),
        };

        let name = match entries.get("name") {
            Some(Value::String(name)) => name.clone(),
            _ => return Err(malformed("name is missing or not a string")),
        };

        let price = stored_number(entries.get("price")).unwrap_or(0.0);
        let discount = stored_number(entries.get("discount")).unwrap_or(0.0);
        let quantity = stored_quantity(entries.get("qty")).unwrap_or(1);
        let fields = match entries.get("fields") {
            Some(Value::Object(fields)) => fields.clone(),
            _ => Fields::new(),
        };

        Self::with_details(id, name, price, quantity, fields, discount)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit price before discount.
    pub fn unit_price(&self) -> f64 {
        self.price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Reads a core attribute or an extension field.
    ///
    /// Core attributes always win: an extension field named `price` is
    /// stored and persisted but can't be read through this accessor.
    pub fn get<'a>(&'a self, field: ItemField<'_>) -> Option<FieldValue<'a>> {
        match field {
            ItemField::Id => Some(FieldValue::Text(&self.id)),
            ItemField::Name => Some(FieldValue::Text(&self.name)),
            ItemField::Price => Some(FieldValue::Number(self.price)),
            ItemField::Qty => Some(FieldValue::Quantity(self.quantity)),
            ItemField::Discount => Some(FieldValue::Number(self.discount)),
            ItemField::Extension(key) => self.fields.get(key).map(FieldValue::Extension),
        }
    }

    /// Like [`get`](Self::get), returning `default` when the field is absent.
    pub fn get_or<'a>(&'a self, field: ItemField<'_>, default: FieldValue<'a>) -> FieldValue<'a> {
        self.get(field).unwrap_or(default)
    }

    // =========================================================================
    // Quantity
    // =========================================================================

    /// Adds `delta` to the quantity.
    ///
    /// No floor is enforced: a negative delta may leave the quantity at zero
    /// or below. Keeping quantities positive is the caller's policy.
    /// The quantity saturates at the `i64` bounds.
    pub fn add(&mut self, delta: i64) {
        self.quantity = self.quantity.saturating_add(delta);
    }

    /// Replaces the quantity. Same permissiveness as [`add`](Self::add).
    pub fn update(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    // =========================================================================
    // Price Math
    // =========================================================================

    /// Net unit price: unit price minus discount.
    pub fn price(&self) -> f64 {
        self.price - self.discount
    }

    /// Line total: net price × quantity.
    pub fn total(&self) -> f64 {
        self.price() * self.quantity as f64
    }

    pub fn has_discount(&self) -> bool {
        self.discount > 0.0
    }

    /// Serializes the item to its persisted shape.
    pub fn to_record(&self) -> ItemRecord {
        ItemRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            qty: self.quantity,
            discount: self.discount,
            fields: self.fields.clone(),
        }
    }
}

impl TryFrom<ItemRecord> for LineItem {
    type Error = CartError;

    fn try_from(record: ItemRecord) -> CartResult<Self> {
        LineItem::with_details(
            record.id,
            record.name,
            record.price,
            record.qty,
            record.fields,
            record.discount,
        )
    }
}

impl From<&LineItem> for ItemRecord {
    fn from(item: &LineItem) -> Self {
        item.to_record()
    }
}

fn malformed(reason: &str) -> CartError {
    CartError::MalformedRecord {
        reason: reason.to_string(),
    }
}

/// Numbers and numeric strings, by the same rule the options filter uses.
fn stored_number(value: Option<&Value>) -> Option<f64> {
    value
        .cloned()
        .map(OptionValue::from)
        .and_then(|value| value.as_number())
}

fn stored_quantity(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
