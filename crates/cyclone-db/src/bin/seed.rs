//! # Seed Data Generator
//!
//! Populates the database with stock items for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default development database
//! cargo run -p cyclone-db --bin seed
//!
//! # Specify database path
//! cargo run -p cyclone-db --bin seed -- --db ./data/cyclone.db
//!
//! # Generate extra synthetic SKUs on top of the catalog
//! cargo run -p cyclone-db --bin seed -- --count 500
//! ```
//!
//! ## Generated Items
//! Creates a realistic vacuum-retailer catalog:
//! - Vacuum units (upright, canister, robot, wet/dry)
//! - Consumables (bags, HEPA filters, belts)
//! - Service parts (motors, hoses, brush rolls)
//!
//! Each item has:
//! - Unique SKU: `{CATEGORY}-{NAME}-{INDEX}`
//! - Opening quantity recorded as a `purchase` movement (so the journal
//!   conserves from day one)
//! - A reorder minimum

use std::env;

use chrono::Utc;
use cyclone_core::{MovementDirection, MovementReason, StockItem};
use cyclone_db::store::inventory::NewMovement;
use cyclone_db::{Database, DbConfig};

/// Catalog categories with (name, unit cost cents, minimum) entries.
const CATALOG: &[(&str, &[(&str, i64, i64)])] = &[
    (
        "VAC",
        &[
            ("Upright 1400W", 42000, 2),
            ("Canister 1600W", 51000, 2),
            ("Robot Vac S1", 89900, 1),
            ("WetDry 20L", 38500, 2),
            ("Stick Cordless", 64900, 2),
            ("Backpack Pro", 112000, 1),
        ],
    ),
    (
        "FLT",
        &[
            ("HEPA H13", 4500, 10),
            ("HEPA H11", 3200, 10),
            ("Foam Pre Filter", 900, 20),
            ("Carbon Filter", 2100, 10),
        ],
    ),
    (
        "BAG",
        &[
            ("Paper Bag 5pk", 1800, 15),
            ("Cloth Bag", 2900, 8),
            ("MicroFleece 10pk", 3400, 10),
        ],
    ),
    (
        "PRT",
        &[
            ("Drive Belt", 1200, 20),
            ("Brush Roll", 5600, 6),
            ("Hose 2m", 4100, 5),
            ("Motor 1400W", 18900, 3),
            ("Power Cord", 3300, 8),
            ("Wheel Set", 2500, 6),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut extra: usize = 0;
    let mut db_path = String::from("./cyclone_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    extra = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cyclone Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Extra synthetic SKUs beyond the catalog (default: 0)");
                println!("  -d, --db <PATH>    Database file path (default: ./cyclone_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Cyclone Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing items
    let existing = db.inventory().list_active().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} stock items", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding catalog...");

    let mut seeded = 0;
    let start = std::time::Instant::now();

    for (category, entries) in CATALOG {
        for (idx, (name, unit_cost_cents, minimum)) in entries.iter().enumerate() {
            let sku = format!(
                "{}-{}-{:02}",
                category,
                name.replace(' ', "").to_uppercase(),
                idx
            );
            seed_item(&db, &sku, name, *unit_cost_cents, *minimum, opening_qty(seeded)).await?;
            seeded += 1;
        }
    }

    // Optional synthetic extras for volume testing
    for n in 0..extra {
        let sku = format!("GEN-PART-{:04}", n);
        let name = format!("Generic Part {}", n);
        let unit_cost = 500 + ((n * 37) % 5000) as i64;
        seed_item(&db, &sku, &name, unit_cost, 5, opening_qty(seeded + n)).await?;
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Seeded {} stock items in {:?}", seeded + extra, elapsed);

    let low = db.inventory().list_below_minimum().await?;
    println!("  Items at/below minimum: {}", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Deterministic opening quantity, 4..=33.
fn opening_qty(seed: usize) -> i64 {
    4 + ((seed * 13) % 30) as i64
}

/// Inserts one item and records its opening stock as a purchase movement.
async fn seed_item(
    db: &Database,
    sku: &str,
    name: &str,
    unit_cost_cents: i64,
    minimum: i64,
    opening: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();

    let item = StockItem {
        sku: sku.to_string(),
        name: name.to_string(),
        quantity: 0, // opening stock arrives as a movement
        minimum_quantity: minimum,
        unit_cost_cents,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    db.inventory().insert_item(&item).await?;

    db.inventory()
        .apply_movement(&NewMovement {
            sku: sku.to_string(),
            direction: MovementDirection::In,
            reason: MovementReason::Purchase,
            quantity: opening,
            unit_cost_cents,
            source_kind: None,
            source_id: None,
            cancellation: false,
            note: Some("Opening stock".to_string()),
        })
        .await?;

    Ok(())
}
