//! # Seed Data Generator
//!
//! Populates a database with a back-office user and products whose stock
//! and prices are fully backed by ledger entries and price timelines.
//!
//! ## Usage
//! ```bash
//! # Generate 100 products (default) in $TALLY_DB_PATH or ./tally.db
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tally-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Products
//! Each product has:
//! - Unique SKU: `{CATEGORY}-{NAME}-{INDEX}`
//! - Cost, retail and wholesale prices registered through the price
//!   timeline (retail $1.99 - $9.99 plus size addon)
//! - Opening stock 0 - 100 recorded as an `input` movement with reason
//!   `initial`

use std::env;

use tally_core::price::PriceChange;
use tally_core::{MovementReason, PriceKind, Product};
use tally_db::{AppConfig, Database, StockRequest};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Orange Juice",
            "Apple Juice",
            "Sparkling Water",
            "Still Water",
            "Iced Tea",
            "Green Tea",
            "Ground Coffee",
            "Cola",
            "Lemonade",
            "Energy Drink",
        ],
    ),
    (
        "SNK",
        &[
            "Potato Chips",
            "Tortilla Chips",
            "Salted Peanuts",
            "Mixed Nuts",
            "Chocolate Bar",
            "Oat Cookies",
            "Crackers",
            "Pretzels",
            "Gummy Bears",
            "Popcorn",
        ],
    ),
    (
        "GRO",
        &[
            "White Rice",
            "Brown Rice",
            "Spaghetti",
            "Penne",
            "Black Beans",
            "Lentils",
            "Canned Tomatoes",
            "Olive Oil",
            "Wheat Flour",
            "Sugar",
        ],
    ),
    (
        "CLN",
        &[
            "Dish Soap",
            "Laundry Detergent",
            "Bleach",
            "Glass Cleaner",
            "Sponges",
            "Paper Towels",
            "Trash Bags",
            "Hand Soap",
            "Floor Cleaner",
            "Toilet Paper",
        ],
    ),
];

/// Size variants and their price addon in cents
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Medium", 100),
    ("Large", 200),
    ("Family", 350),
];

const DEFAULT_COUNT: usize = 100;

struct Args {
    count: usize,
    db_path: Option<String>,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        count: DEFAULT_COUNT,
        db_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.count = value.parse().unwrap_or_else(|_| {
                        warn!(value = %value, "Invalid --count, using default");
                        DEFAULT_COUNT
                    });
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.db_path = Some(value.clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: $TALLY_DB_PATH or ./tally.db)");
                println!("  -h, --help         Show this help message");
                return None;
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    let mut db_config = config.db_config();
    if let Some(path) = args.db_path {
        db_config.database_path = path.into();
    }

    info!(
        database = %db_config.database_path.display(),
        products = args.count,
        "Seeding database"
    );

    let db = Database::new(db_config).await?;

    let existing = db.products().list_ids().await?.len();
    if existing > 0 {
        warn!(
            existing,
            "Database already has products; skipping seed. Delete the database file to regenerate."
        );
        return Ok(());
    }

    let user = db.users().insert("Back Office", "backoffice@tally.local").await?;

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if generated >= args.count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 20 + size_idx;
                match seed_product(&db, &user.id, category_code, name, size, *price_addon, seed).await {
                    Ok(()) => generated += 1,
                    Err(e) => error!(seed, error = %e, "Failed to seed product"),
                }

                if generated > 0 && generated % 50 == 0 {
                    info!(generated, "Progress");
                }
            }
        }
    }

    let elapsed = start.elapsed();
    info!(generated, elapsed = ?elapsed, "Products generated");

    let drifted = db.inventory().reconcile_all().await?;
    if drifted.is_empty() {
        info!("Every stock projection matches its ledger");
    } else {
        warn!(inconsistent = drifted.len(), "Ledger audit found drift");
    }

    println!("✓ Seed complete: {} products in {:?}", generated, elapsed);

    db.close().await;
    Ok(())
}

/// Inserts one product and records its opening prices and stock.
async fn seed_product(
    db: &Database,
    user_id: &str,
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    seed: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let short: String = name.replace(' ', "").chars().take(3).collect();
    let sku = format!("{}-{}-{:04}", category, short.to_uppercase(), seed);

    // Retail $1.99 - $9.99 plus size addon; cost 60-79% of retail,
    // wholesale halfway between
    let retail = 199 + ((seed * 17) % 800) as i64 + price_addon;
    let cost = retail * (60 + (seed % 20) as i64) / 100;
    let wholesale = (retail + cost) / 2;
    let opening_stock = (seed % 101) as i64;

    let product = db
        .products()
        .insert(&Product::new(sku, format!("{} {}", name, size)).with_min_stock(5))
        .await?;

    for (kind, value) in [
        (PriceKind::Cost, cost),
        (PriceKind::Retail, retail),
        (PriceKind::Wholesale, wholesale),
    ] {
        db.prices()
            .register_price_change(PriceChange::new(&product.id, kind, value, user_id))
            .await?;
    }

    if opening_stock > 0 {
        db.inventory()
            .register_input(
                StockRequest::new(&product.id, user_id, opening_stock, cost)
                    .reason(MovementReason::Initial)
                    .notes("Opening stock"),
            )
            .await?;
    }

    Ok(())
}
