//! Marketplace Cart CLI - Inspect and edit the locally persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with totals
//! mp-cart show
//!
//! # Add one unit of a product (appends it if new)
//! mp-cart add --id 1 --title "Shirt" --image-url https://img.example/1.png --price 19.90
//!
//! # Change the quantity of a product already in the cart
//! mp-cart increment 1
//! mp-cart decrement 1
//! ```
//!
//! # Commands
//!
//! - `show` - Print every line and the cart totals
//! - `add` - Add one unit of a product
//! - `increment` / `decrement` - Adjust the quantity of an existing line
//!
//! Configuration comes from `CART_*` environment variables (see
//! `marketplace_cart::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mp-cart")]
#[command(version, about = "Marketplace cart tools")]
struct Cli {
    /// Directory holding the persisted cart (overrides `CART_STORAGE_DIR`)
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add {
        /// Product identifier
        #[arg(long)]
        id: String,

        /// Product title
        #[arg(long)]
        title: String,

        /// Product image URL
        #[arg(long, default_value = "")]
        image_url: String,

        /// Unit price
        #[arg(long)]
        price: Decimal,
    },
    /// Add one unit to a product already in the cart
    Increment {
        /// Product identifier
        id: String,
    },
    /// Remove one unit of a product, dropping the line at zero
    Decrement {
        /// Product identifier
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = marketplace_cart::CartConfig::from_env()?;
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }

    let store = commands::cart::open(&config).await;

    match cli.command {
        Commands::Show => {}
        Commands::Add {
            id,
            title,
            image_url,
            price,
        } => commands::cart::add(&store, id, title, image_url, price)?,
        Commands::Increment { id } => commands::cart::increment(&store, &id)?,
        Commands::Decrement { id } => commands::cart::decrement(&store, &id)?,
    }

    commands::cart::show(&store, config.currency);
    store.flush().await?;
    Ok(())
}
