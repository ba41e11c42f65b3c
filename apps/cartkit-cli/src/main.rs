//! # cartkit Command-Line Entry Point
//!
//! A persistent shopping cart on the command line.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (stderr, `RUST_LOG`)
//! 2. Load configuration (`--config`, platform config dir, environment)
//! 3. Determine the store path (`--store`, `CARTKIT_STORE_PATH`, `[store]`,
//!    platform data dir)
//! 4. Open the cart document and load the cart (`options` stops before this)
//! 5. Run the command; only mutating commands write the document
//!
//! ## Usage
//! ```text
//! cartkit add --id 25 --name "Coffee" --price 4.5 --qty 2 --field size=L
//! cartkit add --id 25 --name "Coffee" --price 4.5 --qty 1 --replace
//! cartkit show [--json]
//! cartkit remove 25
//! cartkit clear
//! cartkit options
//! ```

mod commands;
mod config;

use std::path::PathBuf;

use cartkit_store::FileStorage;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use commands::{AddArgs, CartCommand};
use config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "cartkit", version, about = "Manage a persistent shopping cart")]
struct Cli {
    /// Config file (default: platform config dir, cart.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cart document (default: platform data dir, cart.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List items and totals
    Show {
        /// Print items and totals as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item, or change the quantity of one already in the cart
    Add(AddArgs),
    /// Remove an item by id
    Remove { id: String },
    /// Remove every item
    Clear,
    /// Print the effective cart options
    Options,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config)?;
    let options = config.options();

    let command = match cli.command {
        Command::Options => {
            print!("{}", commands::render_options(&options));
            return Ok(());
        }
        Command::Show { json } => CartCommand::Show { json },
        Command::Add(args) => CartCommand::Add(args),
        Command::Remove { id } => CartCommand::Remove(id),
        Command::Clear => CartCommand::Clear,
    };

    let store_path = cli
        .store
        .or(config.store_path)
        .or_else(config::default_store_path)
        .ok_or("No cart document location available; pass --store")?;

    let storage = FileStorage::open(store_path)?;
    let mut cart = commands::open_cart(&options, storage)?;
    info!(path = ?cart.storage().path(), items = cart.total_items(), "Cart opened");

    print!("{}", commands::execute(&mut cart, command)?);
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - Set `RUST_LOG` to override (e.g., `RUST_LOG=debug`)
/// - Default: warnings, plus info from cartkit crates
/// - Output goes to stderr so stdout stays clean for `show --json`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,cartkit=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
