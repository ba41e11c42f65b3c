//! # Cart Module
//!
//! The cart aggregate: owns line items keyed by id, derives totals, and
//! persists itself through a [`Storage`] backend.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cart Lifecycle                                  │
//! │                                                                         │
//! │  Cart::new(options, storage)                                            │
//! │       │                                                                 │
//! │       ├── filter options against defaults                               │
//! │       └── load() ── storage.get(name) ── rehydrate each record          │
//! │                                          (malformed ones skipped)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  add / remove / clear  ◄──►  subtotal / shipping / tax / total          │
//! │       │                      (recomputed on every call)                 │
//! │       ▼                                                                 │
//! │  save()            explicit write                                       │
//! │  close()           write if autosave, then disarm                       │
//! │  drop              write if autosave and not closed                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Merge Policy
//! Adding an id that is already in the cart only touches the quantity. The
//! price, name, discount and fields of the first item win.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::error::{CartError, CartResult, StorageError};
use crate::item::{ItemRecord, LineItem};
use crate::options::{CartOptions, OptionMap, OptionValue};
use crate::storage::Storage;

// =============================================================================
// Add Mode
// =============================================================================

/// What [`Cart::add_with`] does when the id is already in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddMode {
    /// Add the new quantity to the existing one.
    #[default]
    Append,
    /// Replace the existing quantity with the new one.
    Replace,
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Cart totals summary for front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    #[ts(type = "number")]
    pub total_quantity: i64,
    pub subtotal: f64,
    pub shipping: f64,
    pub tax: f64,
    pub total: f64,
}

impl<S: Storage> From<&Cart<S>> for CartTotals {
    fn from(cart: &Cart<S>) -> Self {
        CartTotals {
            item_count: cart.total_items(),
            total_quantity: cart.total_quantity(),
            subtotal: cart.subtotal(),
            shipping: cart.shipping(),
            tax: cart.tax(),
            total: cart.total(),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by id (adding the same id changes quantity only)
/// - Totals are never cached
///
/// The storage can be owned or borrowed: `Cart<&mut MemoryStorage>` leaves
/// the backend with the caller once the cart is gone.
#[derive(Debug)]
pub struct Cart<S: Storage> {
    items: Vec<LineItem>,
    options: CartOptions,
    storage: S,
    closed: bool,
}

impl<S: Storage> Cart<S> {
    /// Creates a cart from untrusted options and loads any stored items.
    ///
    /// ## Errors
    /// `CartError::Storage` when the backend fails to read. Malformed stored
    /// records are skipped, not reported.
    ///
    /// ## Example
    /// ```rust
    /// use cartkit_core::{Cart, LineItem, MemoryStorage, OptionMap};
    ///
    /// let mut cart = Cart::new(&OptionMap::new(), MemoryStorage::new()).unwrap();
    /// cart.add(LineItem::new("15", "Item", 50.5).unwrap());
    /// cart.add(LineItem::new("15", "Item", 50.5).unwrap());
    ///
    /// assert_eq!(cart.total_items(), 1);
    /// assert_eq!(cart.total(), 101.0);
    /// ```
    pub fn new(user_options: &OptionMap, storage: S) -> CartResult<Self> {
        Self::with_options(CartOptions::filter(user_options), storage)
    }

    /// Creates a cart from already-typed options and loads any stored items.
    pub fn with_options(options: CartOptions, storage: S) -> CartResult<Self> {
        let mut cart = Cart {
            items: Vec::new(),
            options,
            storage,
            closed: false,
        };

        if let Err(err) = cart.load() {
            // An unloaded cart must not autosave over what is stored.
            cart.closed = true;
            return Err(err);
        }

        Ok(cart)
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Adds an item, appending quantity if the id is already present.
    pub fn add(&mut self, item: LineItem) {
        self.add_with(item, AddMode::Append);
    }

    /// Adds an item, resolving an existing id according to `mode`.
    pub fn add_with(&mut self, item: LineItem, mode: AddMode) {
        let Some(existing) = self.items.iter_mut().find(|i| i.id() == item.id()) else {
            debug!(item_id = %item.id(), quantity = item.quantity(), "Adding new item to cart");
            self.items.push(item);
            return;
        };

        match mode {
            AddMode::Append => existing.add(item.quantity()),
            AddMode::Replace => existing.update(item.quantity()),
        }
        debug!(
            item_id = %existing.id(),
            quantity = existing.quantity(),
            ?mode,
            "Updated quantity of item already in cart"
        );
    }

    /// Removes the item with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| i.id() != id);

        let removed = self.items.len() != initial_len;
        if removed {
            debug!(item_id = %id, "Removed item from cart");
        }
        removed
    }

    pub fn in_cart(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id() == id)
    }

    pub fn item(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Removes every item.
    pub fn clear(&mut self) -> &mut Self {
        self.items.clear();
        self
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Sum of line totals. 0 for an empty cart.
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(LineItem::total).sum()
    }

    /// Shipping cost.
    ///
    /// ## Rules
    /// - Empty cart: 0
    /// - `free > 0` and subtotal at or above `free`: 0
    /// - Otherwise: the configured amount
    pub fn shipping(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }

        let shipping = &self.options.shipping;
        if shipping.free > 0.0 && self.subtotal() >= shipping.free {
            return 0.0;
        }

        shipping.amount
    }

    /// Tax on subtotal plus shipping. 0 when the configured rate is 0 or less.
    pub fn tax(&self) -> f64 {
        let rate = self.options.tax;
        if rate <= 0.0 {
            return 0.0;
        }

        (self.subtotal() + self.shipping()) * rate / 100.0
    }

    /// Grand total: subtotal + shipping + tax.
    pub fn total(&self) -> f64 {
        self.subtotal() + self.shipping() + self.tax()
    }

    /// Number of distinct items.
    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    /// Sum of all item quantities, saturating at the `i64` bounds.
    pub fn total_quantity(&self) -> i64 {
        self.items
            .iter()
            .map(LineItem::quantity)
            .fold(0, i64::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }

    // =========================================================================
    // Options
    // =========================================================================

    pub fn options(&self) -> &CartOptions {
        &self.options
    }

    /// Reads an option by key (`name`, `autosave`, `tax`, `shipping`) or
    /// nested path (`shipping.amount`, `shipping.free`).
    ///
    /// ## Errors
    /// `CartError::InvalidOption` for any other name.
    pub fn get_option(&self, name: &str) -> CartResult<OptionValue> {
        self.options
            .get(name)
            .ok_or_else(|| CartError::InvalidOption(name.to_string()))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Item records in insertion order.
    pub fn to_records(&self) -> Vec<ItemRecord> {
        self.items.iter().map(LineItem::to_record).collect()
    }

    /// Writes every item to storage as a map of id to record, under the
    /// configured cart name.
    pub fn save(&mut self) -> CartResult<()> {
        let mut records = Map::new();
        for item in &self.items {
            let record = serde_json::to_value(item.to_record()).map_err(StorageError::from)?;
            records.insert(item.id().to_string(), record);
        }

        self.storage.set(&self.options.name, Value::Object(records))?;
        debug!(key = %self.options.name, count = self.items.len(), "Cart saved");
        Ok(())
    }

    /// Ends the cart's scope: saves if autosave is on and disarms the
    /// drop-time save. Unlike a plain drop, a failed save is returned.
    pub fn close(mut self) -> CartResult<()> {
        self.closed = true;
        if self.options.autosave {
            self.save()?;
        }
        Ok(())
    }

    /// Reads stored records and adds them to the cart.
    ///
    /// Accepts a map of id to record or a plain list of records. Anything
    /// else under the key is ignored.
    fn load(&mut self) -> CartResult<()> {
        let records: Vec<Value> = match self.storage.get(&self.options.name)? {
            Some(Value::Object(records)) => records.into_iter().map(|(_, v)| v).collect(),
            Some(Value::Array(records)) => records,
            Some(_) => {
                debug!(key = %self.options.name, "Stored cart is not a collection, ignoring");
                return Ok(());
            }
            None => return Ok(()),
        };

        let mut loaded = 0usize;
        for (index, record) in records.iter().enumerate() {
            match LineItem::from_stored(record) {
                Ok(item) => {
                    self.add(item);
                    loaded += 1;
                }
                Err(err) => {
                    warn!(key = %self.options.name, index, error = %err, "Skipping malformed cart record");
                }
            }
        }

        debug!(key = %self.options.name, count = loaded, "Cart loaded");
        Ok(())
    }
}

impl<S: Storage> Drop for Cart<S> {
    fn drop(&mut self) {
        if self.closed || !self.options.autosave {
            return;
        }

        if let Err(err) = self.save() {
            warn!(key = %self.options.name, error = %err, "Autosave on drop failed");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageResult;
    use crate::item::Fields;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn options(value: Value) -> OptionMap {
        OptionValue::from(value).into_map().unwrap_or_default()
    }

    fn item(id: &str, price: f64) -> LineItem {
        LineItem::new(id, "Item", price).unwrap()
    }

    fn empty_cart() -> Cart<MemoryStorage> {
        Cart::new(&OptionMap::new(), MemoryStorage::new()).unwrap()
    }

    /// Fails every read and counts writes.
    #[derive(Default)]
    struct BrokenStorage {
        writes: usize,
    }

    impl Storage for BrokenStorage {
        fn get(&self, _key: &str) -> StorageResult<Option<Value>> {
            Err(StorageError::SessionNotFound("gone".to_string()))
        }

        fn set(&mut self, _key: &str, _value: Value) -> StorageResult<()> {
            self.writes += 1;
            Ok(())
        }

        fn remove(&mut self, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        fn clear(&mut self) -> StorageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_no_items_when_cart_is_created() {
        let cart = empty_cart();
        assert!(cart.items().is_empty());
        assert_eq!(cart.total_items(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_no_shipping_cost_when_cart_is_empty() {
        let cart = Cart::new(&options(json!({"shipping": {"amount": 150}})), MemoryStorage::new())
            .unwrap();
        assert_eq!(cart.shipping(), 0.0);
        assert_eq!(cart.total(), 0.0);
    }

    #[test]
    fn test_add_merge_remove_clear_sequence() {
        let mut cart = empty_cart();

        cart.add(item("15", 50.5));
        assert_eq!(cart.total_items(), 1);

        // Same id again: quantities sum
        cart.add(item("15", 50.5));
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.total(), 101.0);

        cart.add(LineItem::new("25", "Item 2", 100.0).unwrap());
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.total(), 201.0);

        // Replace mode: quantity of "15" back to 1
        cart.add_with(item("15", 50.5), AddMode::Replace);
        assert_eq!(cart.total(), 150.5);

        // First price wins
        cart.add(item("15", 1500.0));
        assert_eq!(cart.total(), 201.0);

        assert!(cart.remove("15"));
        assert!(!cart.remove("15"));
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.total(), 100.0);

        cart.clear();
        assert!(cart.items().is_empty());
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total(), 0.0);
    }

    #[test]
    fn test_replace_keeps_original_price() {
        let mut cart = empty_cart();
        cart.add(item("15", 50.5));
        cart.add_with(item("15", 1500.0), AddMode::Replace);

        assert_eq!(cart.total(), 50.5);
        assert_eq!(cart.item("15").map(LineItem::unit_price), Some(50.5));
    }

    #[test]
    fn test_existing_item_keeps_name_and_discount() {
        let mut cart = empty_cart();
        cart.add(LineItem::with_details("1", "First", 10.0, 1, Fields::new(), 2.0).unwrap());
        cart.add(LineItem::with_details("1", "Second", 99.0, 2, Fields::new(), 0.0).unwrap());

        let merged = cart.item("1").unwrap();
        assert_eq!(merged.name(), "First");
        assert_eq!(merged.discount(), 2.0);
        assert_eq!(merged.quantity(), 3);
        assert_eq!(cart.subtotal(), 24.0);
    }

    #[test]
    fn test_clear_is_chainable() {
        let mut cart = empty_cart();
        cart.add(item("1", 10.0));
        assert!(cart.clear().is_empty());
    }

    #[test]
    fn test_tax() {
        let mut cart = Cart::new(&options(json!({"tax": 15})), MemoryStorage::new()).unwrap();
        cart.add(item("25", 100.0));
        assert_eq!(cart.tax(), 15.0);
        assert_eq!(cart.total(), 115.0);
    }

    #[test]
    fn test_negative_tax_is_ignored() {
        let mut cart = Cart::new(&options(json!({"tax": -5})), MemoryStorage::new()).unwrap();
        cart.add(item("25", 100.0));
        assert_eq!(cart.tax(), 0.0);
    }

    #[test]
    fn test_shipping() {
        let mut cart = Cart::new(&options(json!({"shipping": {"amount": 150}})), MemoryStorage::new())
            .unwrap();
        cart.add(item("25", 100.0));
        assert_eq!(cart.total(), 250.0);
    }

    #[test]
    fn test_free_shipping_after_threshold() {
        let mut cart = Cart::new(
            &options(json!({"shipping": {"amount": 150, "free": 500}})),
            MemoryStorage::new(),
        )
        .unwrap();

        cart.add(item("25", 100.0));
        assert_eq!(cart.subtotal(), 100.0);
        assert_eq!(cart.shipping(), 150.0);
        assert_eq!(cart.total(), 250.0);

        cart.add(item("15", 399.0));
        assert_eq!(cart.subtotal(), 499.0);
        assert_eq!(cart.total(), 649.0);

        cart.add(item("13", 1.0));
        assert_eq!(cart.shipping(), 0.0);
        assert_eq!(cart.total(), 500.0);
    }

    #[test]
    fn test_shipping_and_tax() {
        let mut cart = Cart::new(
            &options(json!({"tax": 15, "shipping": {"amount": 150, "free": 700}})),
            MemoryStorage::new(),
        )
        .unwrap();

        cart.add(item("25", 100.0));
        assert_eq!(cart.total(), 287.5);

        cart.add(item("15", 600.0));
        assert_eq!(cart.total(), 805.0);
    }

    #[test]
    fn test_totals_summary() {
        let mut cart = Cart::new(&options(json!({"tax": 10})), MemoryStorage::new()).unwrap();
        cart.add(LineItem::with_details("1", "Item", 10.0, 3, Fields::new(), 0.0).unwrap());
        cart.add(item("2", 20.0));

        assert_eq!(
            cart.totals(),
            CartTotals {
                item_count: 2,
                total_quantity: 4,
                subtotal: 50.0,
                shipping: 0.0,
                tax: 5.0,
                total: 55.0,
            }
        );
    }

    #[test]
    fn test_get_option() {
        let cart = Cart::new(
            &options(json!({"name": "my_cart", "shipping": {"free": "500"}})),
            MemoryStorage::new(),
        )
        .unwrap();

        assert_eq!(cart.get_option("name").unwrap(), OptionValue::from("my_cart"));
        assert_eq!(cart.get_option("autosave").unwrap(), OptionValue::Bool(true));
        assert_eq!(cart.get_option("tax").unwrap(), OptionValue::Number(0.0));
        assert_eq!(cart.get_option("shipping.free").unwrap(), OptionValue::Number(500.0));
        assert!(cart.get_option("shipping").unwrap().as_map().is_some());

        assert!(matches!(
            cart.get_option("currency"),
            Err(CartError::InvalidOption(name)) if name == "currency"
        ));
    }

    #[test]
    fn test_save_writes_records_by_id() {
        let mut cart = Cart::new(&options(json!({"autosave": false})), MemoryStorage::new())
            .unwrap();
        cart.add(item("15", 50.5));
        cart.add(item("25", 100.0));
        cart.save().unwrap();

        let stored = cart.storage().get("shopping_cart").unwrap().unwrap();
        assert_eq!(
            stored,
            json!({
                "15": {"id": "15", "name": "Item", "price": 50.5, "qty": 1, "discount": 0.0, "fields": {}},
                "25": {"id": "25", "name": "Item", "price": 100.0, "qty": 1, "discount": 0.0, "fields": {}}
            })
        );
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut storage = MemoryStorage::new();
        let mut fields = Fields::new();
        fields.insert("color".to_string(), json!("red"));

        let saved = {
            let mut cart = Cart::new(&options(json!({"name": "bag"})), &mut storage).unwrap();
            cart.add(LineItem::with_details("1", "Shirt", 20.0, 2, fields, 5.0).unwrap());
            cart.add(item("2", 3.0));
            cart.save().unwrap();
            cart.to_records()
        };

        let cart = Cart::new(&options(json!({"name": "bag"})), &mut storage).unwrap();
        assert_eq!(cart.to_records(), saved);
        assert_eq!(cart.total(), 33.0);
    }

    #[test]
    fn test_load_skips_malformed_records() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                "shopping_cart",
                json!({
                    "1": {"id": "1", "name": "Good", "price": 10, "qty": 2},
                    "2": "garbage",
                    "3": {"name": "No id", "price": 5},
                    "4": {"id": "4", "name": "Bad price", "price": "cheap", "qty": 1},
                    "5": {"id": "5", "name": "Negative", "price": -1, "qty": 1}
                }),
            )
            .unwrap();

        let cart = Cart::new(&options(json!({"autosave": false})), storage).unwrap();

        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.item("1").map(LineItem::total), Some(20.0));
        assert_eq!(cart.item("4").map(LineItem::unit_price), Some(0.0));
        assert!(!cart.in_cart("5"));
    }

    #[test]
    fn test_load_accepts_record_list_and_merges_duplicates() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                "shopping_cart",
                json!([
                    {"id": "1", "name": "Item", "price": 10, "qty": 1},
                    {"id": "1", "name": "Item", "price": 99, "qty": 2}
                ]),
            )
            .unwrap();

        let cart = Cart::new(&options(json!({"autosave": false})), storage).unwrap();
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.total(), 30.0);
    }

    #[test]
    fn test_load_ignores_non_collection_values() {
        let mut storage = MemoryStorage::new();
        storage.set("shopping_cart", json!("")).unwrap();

        let cart = Cart::new(&options(json!({"autosave": false})), storage).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_autosave_on_drop() {
        let mut storage = MemoryStorage::new();
        {
            let mut cart = Cart::new(&OptionMap::new(), &mut storage).unwrap();
            cart.add(item("1", 10.0));
        }
        assert!(storage.contains_key("shopping_cart"));

        let cart = Cart::new(&OptionMap::new(), &mut storage).unwrap();
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn test_no_save_on_drop_without_autosave() {
        let mut storage = MemoryStorage::new();
        {
            let mut cart = Cart::new(&options(json!({"autosave": false})), &mut storage).unwrap();
            cart.add(item("1", 10.0));
        }
        assert!(storage.is_empty());
    }

    #[test]
    fn test_close_saves_once() {
        let mut storage = MemoryStorage::new();
        let mut cart = Cart::new(&OptionMap::new(), &mut storage).unwrap();
        cart.add(item("1", 10.0));
        cart.close().unwrap();

        assert!(storage.contains_key("shopping_cart"));
    }

    #[test]
    fn test_failed_load_returns_error_without_saving() {
        let mut storage = BrokenStorage::default();
        assert!(matches!(
            Cart::new(&OptionMap::new(), &mut storage),
            Err(CartError::Storage(_))
        ));
        assert_eq!(storage.writes, 0);
    }

    #[test]
    fn test_load_merges_huge_duplicate_quantities() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                "shopping_cart",
                json!([
                    {"id": "1", "name": "Item", "price": 1.0, "qty": i64::MAX},
                    {"id": "1", "name": "Item", "price": 1.0, "qty": i64::MAX},
                    {"id": "2", "name": "Item", "price": 1.0, "qty": 1}
                ]),
            )
            .unwrap();

        let cart = Cart::new(&options(json!({"autosave": false})), &mut storage).unwrap();
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.item("1").unwrap().quantity(), i64::MAX);
        assert_eq!(cart.item("2").unwrap().quantity(), 1);
    }

    #[test]
    fn test_total_quantity_saturates() {
        let mut cart = empty_cart();
        cart.add(LineItem::with_details("1", "Item", 1.0, i64::MAX, Fields::new(), 0.0).unwrap());
        cart.add(item("2", 1.0));

        assert_eq!(cart.total_quantity(), i64::MAX);
        assert_eq!(cart.totals().total_quantity, i64::MAX);
    }
}
