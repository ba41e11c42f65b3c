//! # Options Module
//!
//! Cart configuration and the filter that reconciles user-supplied options
//! with the canonical default shape.
//!
//! ## Filtering Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Options Filter                                    │
//! │                                                                         │
//! │  user options (untrusted)          defaults (canonical shape)           │
//! │  { tax: "15",                      { name: "shopping_cart",             │
//! │    color: "red",                     autosave: true,                    │
//! │    autosave: "yes",                  tax: 0,                            │
//! │    shipping: { amount: 150 } }       shipping: { amount: 0, free: 0 } } │
//! │        │                                   │                            │
//! │        └──────────► intersect_key_recursive ◄┘                          │
//! │                           │                                             │
//! │                           ▼                                             │
//! │            { tax: 15.0, shipping: { amount: 150.0 } }                   │
//! │              (color: unknown key, autosave: wrong kind → dropped)       │
//! │                           │                                             │
//! │                           ▼                                             │
//! │             replace_recursive(defaults, filtered)                       │
//! │                           │                                             │
//! │                           ▼                                             │
//! │  { name: "shopping_cart", autosave: true, tax: 15.0,                    │
//! │    shipping: { amount: 150.0, free: 0.0 } }                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cartkit_core::options::{CartOptions, OptionMap, OptionValue};
//!
//! let mut user = OptionMap::new();
//! user.insert("tax".to_string(), OptionValue::from("15"));
//! user.insert("autosave".to_string(), OptionValue::from("true"));
//!
//! let options = CartOptions::filter(&user);
//! assert_eq!(options.tax, 15.0);
//! assert!(options.autosave); // string where a bool belongs: default kept
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Storage key used when no `name` option is supplied.
pub const DEFAULT_CART_NAME: &str = "shopping_cart";

// =============================================================================
// Option Tree
// =============================================================================

/// A nested, string-keyed option structure.
pub type OptionMap = BTreeMap<String, OptionValue>;

/// One node of a loosely-typed option tree.
///
/// User input (TOML, JSON, environment) is converted into this shape first,
/// and only then checked against the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<OptionValue>),
    Map(OptionMap),
}

/// The kind of an [`OptionValue`], used for compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Null,
    Bool,
    Number,
    Text,
    List,
    Map,
}

impl OptionValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Null => OptionKind::Null,
            OptionValue::Bool(_) => OptionKind::Bool,
            OptionValue::Number(_) => OptionKind::Number,
            OptionValue::Text(_) => OptionKind::Text,
            OptionValue::List(_) => OptionKind::List,
            OptionValue::Map(_) => OptionKind::Map,
        }
    }

    /// Interprets the value as a number.
    ///
    /// Numbers are returned as-is; text is accepted when it parses as a
    /// finite number after trimming (`"12"`, `" 34.5 "`). Everything else,
    /// booleans included, is not numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            OptionValue::Number(n) => Some(*n),
            OptionValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OptionMap> {
        match self {
            OptionValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Consumes the value, returning the map if it is one.
    pub fn into_map(self) -> Option<OptionMap> {
        match self {
            OptionValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Number(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Number(value as f64)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Number(f64::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<OptionMap> for OptionValue {
    fn from(value: OptionMap) -> Self {
        OptionValue::Map(value)
    }
}

impl From<Vec<OptionValue>> for OptionValue {
    fn from(value: Vec<OptionValue>) -> Self {
        OptionValue::List(value)
    }
}

impl From<serde_json::Value> for OptionValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => OptionValue::Null,
            Value::Bool(b) => OptionValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(OptionValue::Null, OptionValue::Number),
            Value::String(s) => OptionValue::Text(s),
            Value::Array(items) => {
                OptionValue::List(items.into_iter().map(OptionValue::from).collect())
            }
            Value::Object(entries) => OptionValue::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, OptionValue::from(value)))
                    .collect(),
            ),
        }
    }
}

// =============================================================================
// Filter
// =============================================================================

/// Recursively keeps the entries of `user` whose keys exist in `defaults`
/// and whose values are compatible with the default at that key.
///
/// ## Rules (per key present in both)
/// 1. Default numeric and user value numeric → coerced to `Number`
/// 2. Kinds differ → dropped
/// 3. Both maps → recurse
/// 4. Otherwise → kept verbatim
///
/// Keys missing from `defaults` are always dropped, never an error.
pub fn intersect_key_recursive(user: &OptionMap, defaults: &OptionMap) -> OptionMap {
    let mut filtered = OptionMap::new();

    for (key, value) in user {
        let Some(default) = defaults.get(key) else {
            continue;
        };

        if default.as_number().is_some() {
            if let Some(number) = value.as_number() {
                filtered.insert(key.clone(), OptionValue::Number(number));
                continue;
            }
        }

        if default.kind() != value.kind() {
            continue;
        }

        let kept = match (value, default) {
            (OptionValue::Map(nested), OptionValue::Map(nested_defaults)) => {
                OptionValue::Map(intersect_key_recursive(nested, nested_defaults))
            }
            _ => value.clone(),
        };
        filtered.insert(key.clone(), kept);
    }

    filtered
}

/// Overlays `overlay` on a copy of `base`. Nested maps merge key by key;
/// any other value replaces the base value outright. `base` is untouched.
pub fn replace_recursive(base: &OptionMap, overlay: &OptionMap) -> OptionMap {
    let mut merged = base.clone();

    for (key, value) in overlay {
        if let (Some(OptionValue::Map(existing)), OptionValue::Map(incoming)) =
            (merged.get_mut(key), value)
        {
            let combined = replace_recursive(existing, incoming);
            *existing = combined;
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }

    merged
}

// =============================================================================
// Cart Options
// =============================================================================

/// Shipping cost configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingOptions {
    /// Flat shipping cost charged on a non-empty cart.
    pub amount: f64,

    /// Subtotal at or above which shipping is waived. 0 disables the waiver.
    pub free: f64,
}

/// The fixed-shape cart configuration.
///
/// ## Defaults
/// | Key | Default |
/// |-----|---------|
/// | `name` | `"shopping_cart"` |
/// | `autosave` | `true` |
/// | `tax` | `0` |
/// | `shipping.amount` | `0` |
/// | `shipping.free` | `0` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartOptions {
    /// Storage key the cart is persisted under.
    pub name: String,

    /// Save automatically when the cart goes out of scope.
    pub autosave: bool,

    /// Tax percentage applied to subtotal + shipping (15 = 15%).
    pub tax: f64,

    pub shipping: ShippingOptions,
}

impl Default for CartOptions {
    fn default() -> Self {
        CartOptions {
            name: DEFAULT_CART_NAME.to_string(),
            autosave: true,
            tax: 0.0,
            shipping: ShippingOptions::default(),
        }
    }
}

impl CartOptions {
    /// Merges untrusted user options into the defaults.
    ///
    /// Unknown keys are dropped and kind-mismatched values fall back to the
    /// default at that key, recursively. Never fails.
    pub fn filter(user: &OptionMap) -> Self {
        let defaults = CartOptions::default().to_option_map();
        let merged = replace_recursive(&defaults, &intersect_key_recursive(user, &defaults));
        CartOptions::from_option_map(&merged)
    }

    /// Converts the options into their canonical tree form.
    pub fn to_option_map(&self) -> OptionMap {
        let mut shipping = OptionMap::new();
        shipping.insert("amount".to_string(), self.shipping.amount.into());
        shipping.insert("free".to_string(), self.shipping.free.into());

        let mut map = OptionMap::new();
        map.insert("name".to_string(), self.name.clone().into());
        map.insert("autosave".to_string(), self.autosave.into());
        map.insert("tax".to_string(), self.tax.into());
        map.insert("shipping".to_string(), shipping.into());
        map
    }

    /// Builds options from a tree, taking the default for any key that is
    /// missing or of the wrong kind.
    pub fn from_option_map(map: &OptionMap) -> Self {
        let defaults = CartOptions::default();
        let shipping = map.get("shipping").and_then(OptionValue::as_map);
        let shipping_number = |key: &str, fallback: f64| {
            shipping
                .and_then(|s| s.get(key))
                .and_then(OptionValue::as_number)
                .unwrap_or(fallback)
        };

        CartOptions {
            name: map
                .get("name")
                .and_then(OptionValue::as_str)
                .map_or(defaults.name, str::to_string),
            autosave: map
                .get("autosave")
                .and_then(OptionValue::as_bool)
                .unwrap_or(defaults.autosave),
            tax: map
                .get("tax")
                .and_then(OptionValue::as_number)
                .unwrap_or(defaults.tax),
            shipping: ShippingOptions {
                amount: shipping_number("amount", defaults.shipping.amount),
                free: shipping_number("free", defaults.shipping.free),
            },
        }
    }

    /// Looks up an option by key or dotted path (`"shipping.free"`).
    pub fn get(&self, path: &str) -> Option<OptionValue> {
        let map = self.to_option_map();
        let mut segments = path.split('.');
        let mut current = map.get(segments.next()?)?;

        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }

        Some(current.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
