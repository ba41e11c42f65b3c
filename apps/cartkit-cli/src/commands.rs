//! # Cart Commands
//!
//! Command handlers behind the `cartkit` subcommands. Handlers return the
//! text to print; `main` owns printing.
//!
//! ```text
//! show ──────► render_cart / CartResponse (--json)      read-only
//! add ───────► add_item ──► Cart::add_with ──► save
//! remove ────► Cart::remove ──► save (only if something was removed)
//! clear ─────► Cart::clear ──► save
//! options ───► render_options                           no store access
//! ```
//!
//! Carts opened here never autosave. Mutating commands save once,
//! explicitly, so read-only commands leave the document alone.

use cartkit_core::{
    AddMode, Cart, CartError, CartOptions, CartResult, CartTotals, Fields, ItemRecord, LineItem,
    Storage,
};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// A command that works on the stored cart.
#[derive(Debug, Clone)]
pub enum CartCommand {
    Show { json: bool },
    Add(AddArgs),
    Remove(String),
    Clear,
}

/// Opens a cart for one command. Saving is left to [`execute`].
pub fn open_cart<S: Storage>(options: &CartOptions, storage: S) -> CartResult<Cart<S>> {
    let options = CartOptions {
        autosave: false,
        ..options.clone()
    };
    Cart::with_options(options, storage)
}

/// Runs `command` and returns its output. Mutations are saved before
/// returning.
pub fn execute<S: Storage>(cart: &mut Cart<S>, command: CartCommand) -> CommandResult<String> {
    let output = match command {
        CartCommand::Show { json: true } => {
            let mut rendered = serde_json::to_string_pretty(&CartResponse::from(&*cart))?;
            rendered.push('\n');
            return Ok(rendered);
        }
        CartCommand::Show { json: false } => return Ok(render_cart(cart)),
        CartCommand::Add(args) => {
            add_item(cart, args)?;
            render_cart(cart)
        }
        CartCommand::Remove(id) => {
            if !cart.remove(&id) {
                return Ok(format!("{id} is not in the cart\n"));
            }
            format!("Removed {id}\n")
        }
        CartCommand::Clear => {
            cart.clear();
            "Cart cleared\n".to_string()
        }
    };

    cart.save()?;
    Ok(output)
}

/// Arguments for `cartkit add`.
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Item id
    #[arg(long)]
    pub id: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Unit price
    #[arg(long)]
    pub price: f64,

    /// Quantity to add (or to set, with --replace)
    #[arg(long, default_value_t = 1)]
    pub qty: i64,

    /// Per-unit discount
    #[arg(long, default_value_t = 0.0)]
    pub discount: f64,

    /// Extra attribute as key=value; repeatable
    #[arg(long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, Value)>,

    /// Set the quantity of an existing item instead of adding to it
    #[arg(long)]
    pub replace: bool,
}

/// Cart response including items and totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<ItemRecord>,
    pub totals: CartTotals,
}

impl<S: Storage> From<&Cart<S>> for CartResponse {
    fn from(cart: &Cart<S>) -> Self {
        CartResponse {
            items: cart.to_records(),
            totals: cart.totals(),
        }
    }
}

/// Parses `key=value`. Values that read as JSON scalars keep their type,
/// anything else is taken as text.
pub fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in '{raw}'"));
    }

    let value = match serde_json::from_str::<Value>(value) {
        Ok(parsed @ (Value::Number(_) | Value::Bool(_))) => parsed,
        _ => Value::String(value.to_string()),
    };
    Ok((key.to_string(), value))
}

/// Validates the arguments into a line item and adds it.
pub fn add_item<S: Storage>(cart: &mut Cart<S>, args: AddArgs) -> CartResult<()> {
    let fields: Fields = args.fields.into_iter().collect();
    let item = LineItem::with_details(args.id, args.name, args.price, args.qty, fields, args.discount)?;
    let mode = if args.replace {
        AddMode::Replace
    } else {
        AddMode::Append
    };

    debug!(item_id = %item.id(), quantity = item.quantity(), ?mode, "Adding item from command line");
    cart.add_with(item, mode);
    Ok(())
}

pub fn render_cart<S: Storage>(cart: &Cart<S>) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in cart.items() {
        out.push_str(&format!(
            "{:<12} {:<24} {:>4} x {:>10.2}",
            item.id(),
            item.name(),
            item.quantity(),
            item.price()
        ));
        if item.has_discount() {
            out.push_str(&format!(" (-{:.2})", item.discount()));
        }
        out.push_str(&format!(" = {:>10.2}\n", item.total()));
    }

    let totals = cart.totals();
    for (label, amount) in [
        ("Subtotal", totals.subtotal),
        ("Shipping", totals.shipping),
        ("Tax", totals.tax),
        ("Total", totals.total),
    ] {
        out.push_str(&format!("{label:>40} {amount:>20.2}\n"));
    }
    out
}

pub fn render_options(options: &CartOptions) -> String {
    format!(
        "name            = {}\nautosave        = {}\ntax             = {}\nshipping.amount = {}\nshipping.free   = {}\n",
        options.name, options.autosave, options.tax, options.shipping.amount, options.shipping.free
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cartkit_core::{MemoryStorage, OptionMap};
    use serde_json::json;

    fn args(id: &str, price: f64, qty: i64) -> AddArgs {
        AddArgs {
            id: id.to_string(),
            name: format!("Item {id}"),
            price,
            qty,
            discount: 0.0,
            fields: Vec::new(),
            replace: false,
        }
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field("size=L").unwrap(), ("size".to_string(), json!("L")));
        assert_eq!(parse_field("weight=1.5").unwrap(), ("weight".to_string(), json!(1.5)));
        assert_eq!(parse_field("gift=true").unwrap(), ("gift".to_string(), json!(true)));
        assert_eq!(parse_field("note=a=b").unwrap(), ("note".to_string(), json!("a=b")));
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn test_add_then_replace() {
        let mut cart = Cart::new(&OptionMap::new(), MemoryStorage::new()).unwrap();

        add_item(&mut cart, args("1", 10.0, 2)).unwrap();
        add_item(&mut cart, args("1", 10.0, 3)).unwrap();
        assert_eq!(cart.item("1").unwrap().quantity(), 5);

        let mut replace = args("1", 10.0, 1);
        replace.replace = true;
        add_item(&mut cart, replace).unwrap();
        assert_eq!(cart.item("1").unwrap().quantity(), 1);
    }

    #[test]
    fn test_add_rejects_invalid_input() {
        let mut cart = Cart::new(&OptionMap::new(), MemoryStorage::new()).unwrap();
        assert!(matches!(
            add_item(&mut cart, args("1", -1.0, 1)),
            Err(CartError::InvalidArgument(_))
        ));
        assert!(matches!(
            add_item(&mut cart, args("1", 1.0, 0)),
            Err(CartError::InvalidArgument(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_keeps_fields() {
        let mut cart = Cart::new(&OptionMap::new(), MemoryStorage::new()).unwrap();
        let mut with_fields = args("7", 5.0, 1);
        with_fields.fields = vec![("size".to_string(), json!("L"))];
        add_item(&mut cart, with_fields).unwrap();

        assert_eq!(cart.item("7").unwrap().fields().get("size"), Some(&json!("L")));
    }

    #[test]
    fn test_render_cart() {
        let mut cart = Cart::new(&OptionMap::new(), MemoryStorage::new()).unwrap();
        assert_eq!(render_cart(&cart), "Cart is empty\n");

        add_item(&mut cart, args("25", 100.0, 1)).unwrap();
        let rendered = render_cart(&cart);
        assert!(rendered.contains("Item 25"));
        assert!(rendered.contains("100.00"));
        assert!(rendered.contains("Total"));
    }

    #[test]
    fn test_cart_response_json() {
        let mut cart = Cart::new(&OptionMap::new(), MemoryStorage::new()).unwrap();
        add_item(&mut cart, args("25", 100.0, 2)).unwrap();

        let response = serde_json::to_value(CartResponse::from(&cart)).unwrap();
        assert_eq!(response["items"][0]["id"], json!("25"));
        assert_eq!(response["totals"]["total"], json!(200.0));
    }

    #[test]
    fn test_render_options() {
        let rendered = render_options(&CartOptions::default());
        assert!(rendered.contains("name            = shopping_cart"));
        assert!(rendered.contains("autosave        = true"));
    }

    #[test]
    fn test_read_only_commands_never_write() {
        let mut storage = MemoryStorage::new();
        {
            let mut cart = open_cart(&CartOptions::default(), &mut storage).unwrap();
            execute(&mut cart, CartCommand::Show { json: false }).unwrap();
            execute(&mut cart, CartCommand::Show { json: true }).unwrap();
            execute(&mut cart, CartCommand::Remove("missing".to_string())).unwrap();
            cart.close().unwrap();
        }
        assert!(storage.is_empty());
    }

    #[test]
    fn test_mutating_commands_save_once() {
        let mut storage = MemoryStorage::new();
        {
            let mut cart = open_cart(&CartOptions::default(), &mut storage).unwrap();
            let output = execute(&mut cart, CartCommand::Add(args("25", 100.0, 2))).unwrap();
            assert!(output.contains("Item 25"));
        }
        assert_eq!(
            storage.get("shopping_cart").unwrap().unwrap()["25"]["qty"],
            json!(2)
        );

        {
            let mut cart = open_cart(&CartOptions::default(), &mut storage).unwrap();
            let output = execute(&mut cart, CartCommand::Remove("25".to_string())).unwrap();
            assert_eq!(output, "Removed 25\n");
        }
        assert_eq!(storage.get("shopping_cart").unwrap(), Some(json!({})));
    }
}
