//! # CLI Configuration
//!
//! Builds the user option map handed to the cart, plus the store location.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CARTKIT_CART_NAME=wishlist                                         │
//! │     CARTKIT_AUTOSAVE=false                                             │
//! │     CARTKIT_TAX=15                                                     │
//! │     CARTKIT_SHIPPING_AMOUNT=150   CARTKIT_SHIPPING_FREE=700            │
//! │     CARTKIT_STORE_PATH=/tmp/cart.json                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/cartkit/cart.toml (Linux)                                │
//! │     ~/Library/Application Support/com.cartkit.cartkit/cart.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     name = "shopping_cart", autosave = true, no tax, no shipping       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # cart.toml
//! [cart]
//! name = "shopping_cart"
//! autosave = true
//! tax = 15
//!
//! [cart.shipping]
//! amount = 150
//! free = 700
//!
//! [store]
//! path = "/var/lib/cartkit/cart.json"
//! ```
//!
//! The `[cart]` table is not deserialized into a typed struct. It is kept as
//! a loose option tree so the cart's options filter decides what survives:
//! `tax = "15"` becomes `15.0`, `autosave = "yes"` falls back to the default
//! and unknown keys are dropped.

use std::path::PathBuf;

use cartkit_core::{CartOptions, OptionMap, OptionValue};
use directories::ProjectDirs;
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Configuration
// =============================================================================

/// Everything the CLI reads before touching the cart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliConfig {
    /// Unfiltered cart options.
    pub cart: OptionMap,

    /// Where the cart document lives, if configured.
    pub store_path: Option<PathBuf>,
}

impl CliConfig {
    /// Loads configuration with environment overrides applied.
    ///
    /// A missing config file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(default_config_path) {
            if path.exists() {
                info!(?path, "Loading cart config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses the `[cart]` and `[store]` tables of a TOML document.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let document: toml::Table = contents.parse()?;
        let mut config = Self::default();

        if let Some(cart) = document.get("cart") {
            match option_from_toml(cart.clone()) {
                OptionValue::Map(cart) => config.cart = cart,
                _ => warn!("[cart] is not a table, ignoring"),
            }
        }

        config.store_path = document
            .get("store")
            .and_then(|store| store.get("path"))
            .and_then(toml::Value::as_str)
            .map(PathBuf::from);

        Ok(config)
    }

    /// The options a cart built from this configuration will use.
    pub fn options(&self) -> CartOptions {
        CartOptions::filter(&self.cart)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Values go in as text; the options filter coerces numeric strings.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("CARTKIT_CART_NAME") {
            debug!(name = %name, "Overriding cart name from environment");
            self.cart.insert("name".to_string(), OptionValue::Text(name));
        }

        if let Some(raw) = lookup("CARTKIT_AUTOSAVE") {
            match raw.trim().to_lowercase().parse::<bool>() {
                Ok(autosave) => {
                    self.cart
                        .insert("autosave".to_string(), OptionValue::Bool(autosave));
                }
                Err(_) => warn!(value = %raw, "CARTKIT_AUTOSAVE is not true or false, ignoring"),
            }
        }

        if let Some(tax) = lookup("CARTKIT_TAX") {
            self.cart.insert("tax".to_string(), OptionValue::Text(tax));
        }

        let amount = lookup("CARTKIT_SHIPPING_AMOUNT");
        let free = lookup("CARTKIT_SHIPPING_FREE");
        if amount.is_some() || free.is_some() {
            let mut shipping = match self.cart.remove("shipping") {
                Some(OptionValue::Map(shipping)) => shipping,
                _ => OptionMap::new(),
            };
            if let Some(amount) = amount {
                shipping.insert("amount".to_string(), OptionValue::Text(amount));
            }
            if let Some(free) = free {
                shipping.insert("free".to_string(), OptionValue::Text(free));
            }
            self.cart
                .insert("shipping".to_string(), OptionValue::Map(shipping));
        }

        if let Some(path) = lookup("CARTKIT_STORE_PATH") {
            debug!(path = %path, "Overriding store path from environment");
            self.store_path = Some(PathBuf::from(path));
        }
    }
}

/// Converts a TOML value into a loose option tree.
pub fn option_from_toml(value: toml::Value) -> OptionValue {
    match value {
        toml::Value::String(s) => OptionValue::Text(s),
        toml::Value::Integer(i) => OptionValue::from(i),
        toml::Value::Float(f) => OptionValue::Number(f),
        toml::Value::Boolean(b) => OptionValue::Bool(b),
        toml::Value::Datetime(dt) => OptionValue::Text(dt.to_string()),
        toml::Value::Array(items) => {
            OptionValue::List(items.into_iter().map(option_from_toml).collect())
        }
        toml::Value::Table(table) => OptionValue::Map(
            table
                .into_iter()
                .map(|(key, value)| (key, option_from_toml(value)))
                .collect(),
        ),
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "cartkit", "cartkit")
}

/// Returns the default config file path.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("cart.toml"))
}

/// Returns the default cart document path.
pub fn default_store_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("cart.json"))
}

// =============================================================================
// Unit Tests
// =============================================================================
