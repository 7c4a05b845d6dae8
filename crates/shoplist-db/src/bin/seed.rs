//! # Seed Data Generator
//!
//! Populates a database with demo categories and items for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./shoplist_dev.db (default)
//! cargo run -p shoplist-db --bin seed
//!
//! # Specify database path
//! cargo run -p shoplist-db --bin seed -- --db ./data/shoplist.db
//!
//! # Categories and usual items only, empty shopping list
//! cargo run -p shoplist-db --bin seed -- --catalog-only
//! ```
//!
//! ## Generated Data
//! - Categories in a typical store walk order (ranks 1..N)
//! - A usual items catalog spread over those categories
//! - Every third usual item put on the shopping list

use std::env;

use shoplist_core::UsualItem;
use shoplist_db::{Database, DbConfig};

/// Categories with their usual items, in store walk order.
const CATALOG: &[(&str, &[(&str, &str)])] = &[
    (
        "Fruit & Vegetables",
        &[
            ("Apples", "6"),
            ("Bananas", "1 bunch"),
            ("Carrots", "1 kg"),
            ("Onions", "1 kg"),
            ("Tomatoes", "500 g"),
            ("Lettuce", "1"),
        ],
    ),
    (
        "Bakery",
        &[("Bread", "1"), ("Croissants", "4"), ("Bagels", "6")],
    ),
    (
        "Dairy",
        &[
            ("Milk", "2"),
            ("Eggs", "12"),
            ("Butter", "250 g"),
            ("Yoghurt", "4"),
            ("Cheddar", "200 g"),
        ],
    ),
    (
        "Meat & Fish",
        &[("Chicken breast", "500 g"), ("Minced beef", "500 g"), ("Salmon", "2")],
    ),
    (
        "Pantry",
        &[
            ("Pasta", "500 g"),
            ("Rice", "1 kg"),
            ("Tinned tomatoes", "2"),
            ("Olive oil", "1 l"),
            ("Coffee", "250 g"),
        ],
    ),
    (
        "Frozen",
        &[("Peas", "1 kg"), ("Ice cream", "1")],
    ),
    (
        "Household",
        &[("Dish soap", "1"), ("Toilet paper", "9"), ("Bin bags", "1 roll")],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./shoplist_dev.db");
    let mut catalog_only = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--catalog-only" => catalog_only = true,
            "--help" | "-h" => {
                println!("Shoplist Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./shoplist_dev.db)");
                println!("      --catalog-only Leave the shopping list empty");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Shoplist Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.categories().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} categories", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut usual_count = 0;
    let mut listed = 0;

    for (category, items) in CATALOG {
        db.categories().insert_by_name(category).await?;

        for (name, quantity) in items.iter() {
            let usual = match db.usual_items().insert(&UsualItem::new(*name, *category, *quantity)).await {
                Ok(usual) => usual,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", name, e);
                    continue;
                }
            };
            usual_count += 1;

            if !catalog_only && usual_count % 3 == 0 {
                db.usual_items().add_to_shopping_list(&usual).await?;
                listed += 1;
            }
        }
    }

    println!();
    println!("✓ {} categories", CATALOG.len());
    println!("✓ {} usual items", usual_count);
    println!("✓ {} shopping items", listed);
    println!("  Done in {:?}", start.elapsed());

    db.close().await;
    Ok(())
}
