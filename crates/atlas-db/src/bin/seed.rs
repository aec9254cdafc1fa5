//! # Seed Data Generator
//!
//! Provisions a development database: sequence counters, reservation pool
//! numbers, workflow config versions, and starting stock.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults (./data/atlas.db, 500 pool numbers)
//! cargo run -p atlas-db --bin seed
//!
//! # Custom pool size
//! cargo run -p atlas-db --bin seed -- --pool-size 1000
//!
//! # Specify database path
//! cargo run -p atlas-db --bin seed -- --db ./data/atlas.db
//! ```
//!
//! ## What Gets Seeded
//! - A day-scoped `InventoryCheckOut` counter (prefix `CO-`) for today
//! - A day-scoped `Receipt` counter (prefix `R-`) for today
//! - `PurchaseInvoice` reservation pool numbers 1..=pool-size
//! - One open-ended workflow config version per object class
//! - Starting stock for a handful of demo SKUs

use std::env;

use chrono::{Datelike, Utc};
use tracing::info;

use atlas_core::sequence::{IntervalScope, SequenceTemplate};
use atlas_core::workflow::object_type;
use atlas_db::repository::stock::StockRepository;
use atlas_db::{Database, DbConfig, DbError};

/// Demo SKUs with starting stock levels.
const STARTING_STOCK: &[(&str, i64)] = &[
    ("BEV-0001", 120),
    ("BEV-0002", 80),
    ("SNK-0001", 200),
    ("SNK-0002", 150),
    ("DRY-0001", 60),
];

#[tokio::main]
async fn main() -> Result<(), DbError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (db_path, pool_size) = parse_args();

    info!(db = %db_path, pool_size = pool_size, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let today = Utc::now().date_naive();
    let day_scope = IntervalScope::Day {
        year: today.year(),
        month: today.month(),
        day: today.day(),
    };

    // Day-scoped counters for the counter-allocated modules
    db.sequences()
        .provision(
            object_type::INVENTORY_CHECK_OUT,
            day_scope,
            &SequenceTemplate::new("CO-", ""),
            0,
        )
        .await?;
    db.sequences()
        .provision(
            object_type::RECEIPT,
            day_scope,
            &SequenceTemplate::new("R-", ""),
            0,
        )
        .await?;
    info!("Sequence counters provisioned");

    // Reservation pool for invoice numbers
    let inserted = db
        .reservations()
        .populate(object_type::PURCHASE_INVOICE, 1, pool_size)
        .await?;
    info!(inserted = inserted, "Reservation pool populated");

    // One open-ended workflow config version per class
    for class in [
        object_type::INVENTORY_CHECK_OUT,
        object_type::PURCHASE_INVOICE,
        object_type::RECEIPT,
        object_type::EMPLOYEE,
    ] {
        db.history().add_config(class, today, None, "v1").await?;
    }
    info!("Workflow config versions registered");

    // Starting stock
    let mut conn = db.pool().acquire().await?;
    for (sku, quantity) in STARTING_STOCK {
        StockRepository::adjust(&mut conn, sku, *quantity).await?;
    }
    drop(conn);
    info!(products = STARTING_STOCK.len(), "Starting stock loaded");

    db.close().await;

    info!("Seed complete");
    Ok(())
}

/// Parses `--db <path>` and `--pool-size <n>` from the command line.
fn parse_args() -> (String, i64) {
    let args: Vec<String> = env::args().collect();
    let mut db_path = "./data/atlas.db".to_string();
    let mut pool_size: i64 = 500;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" if i + 1 < args.len() => {
                db_path = args[i + 1].clone();
                i += 2;
            }
            "--pool-size" if i + 1 < args.len() => {
                pool_size = args[i + 1].parse().unwrap_or(500);
                i += 2;
            }
            _ => i += 1,
        }
    }

    (db_path, pool_size)
}
