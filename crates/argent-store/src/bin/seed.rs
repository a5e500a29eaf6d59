//! # Seed Data Generator
//!
//! Populates a store file with a small demo tree for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default file
//! cargo run -p argent-store --bin seed
//!
//! # Specify the store file
//! cargo run -p argent-store --bin seed -- --file ./data/ledger.json
//! ```
//!
//! ## Generated Tree
//! Two branches with assigned users, a handful of silver products with
//! realistic gram quantities and cost bases, and a few ledger entries so
//! every collection renders with data.

use chrono::{Duration, Utc};
use serde_json::json;
use std::env;
use uuid::Uuid;

use argent_store::{JsonStore, PersistenceGateway, StoreConfig};

const PRODUCTS: &[(&str, f64, f64)] = &[
    // (name, grams, cost basis total)
    ("ring-925", 320.0, 640.0),
    ("chain-925", 150.0, 450.0),
    ("bracelet-925", 210.5, 520.0),
    ("earring-925", 95.0, 190.0),
    ("scrap-925", 400.0, 600.0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut file_path = String::from("./ledger_dev.json");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    file_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Argent Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -f, --file <PATH>  Store file path (default: ./ledger_dev.json)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Argent Ledger Seed Data Generator");
    println!("====================================");
    println!("Store file: {}", file_path);
    println!();

    let store = JsonStore::open(StoreConfig::new(&file_path)).await?;

    // Refuse to clobber an existing tree.
    if store.read("branchMetadata").await?.is_some() {
        println!("⚠ Store already has branch metadata");
        println!("  Skipping seed to avoid clobbering data.");
        println!("  Delete the store file to regenerate.");
        return Ok(());
    }

    let downtown = Uuid::new_v4().to_string();
    let harbor = Uuid::new_v4().to_string();
    let now = Utc::now();
    let yesterday = now - Duration::days(1);

    let downtown_book = json!({
        "products": PRODUCTS.iter().map(|(name, qty, cost)| json!({
            "name": name, "quantity": qty, "purchasePrice": cost,
        })).collect::<Vec<_>>(),
        "sales": [{
            "id": Uuid::new_v4().to_string(),
            "date": yesterday.to_rfc3339(),
            "product": "ring-925",
            "quantity": 12.5,
            "price": 310.0,
            "customerPhone": "0100000000",
            "customerDetails": "walk-in",
            "details": "",
            "paymentMethod": "cash",
            "user": "sara",
            "type": "sale",
        }],
        "returns": [],
        "receiving": [{
            "id": Uuid::new_v4().to_string(),
            "date": (yesterday - Duration::days(2)).to_rfc3339(),
            "product": "ring-925",
            "quantity": 100.0,
            "purchasePrice": 2.0,
            "supplierName": "al-noor",
            "user": "admin",
        }],
        "expenses": [{
            "id": Uuid::new_v4().to_string(),
            "date": yesterday.to_rfc3339(),
            "expenseType": "scrapPurchase",
            "amount": 150.0,
            "description": "walk-in scrap lot",
            "user": "sara",
            "scrapType": "scrap-925",
            "scrapQuantity": 80.0,
        }],
        "revision": 1,
        "lastUpdated": now.to_rfc3339(),
    });
    let harbor_book = json!({
        "products": [],
        "sales": [],
        "returns": [],
        "receiving": [],
        "expenses": [],
        "revision": 0,
        "lastUpdated": now.to_rfc3339(),
    });

    let mut metadata = serde_json::Map::new();
    metadata.insert(
        downtown.clone(),
        json!({ "name": "downtown", "users": ["sara", "omar"] }),
    );
    metadata.insert(
        harbor.clone(),
        json!({ "name": "harbor", "users": ["omar"] }),
    );

    let mut branch_data = serde_json::Map::new();
    branch_data.insert(downtown, downtown_book);
    branch_data.insert(harbor, harbor_book);

    let tree = json!({
        "branchMetadata": metadata,
        "branchData": branch_data,
    });

    store.write_at_root(tree).await?;

    println!("✓ Seeded 2 branches");
    println!("  downtown: {} products, 1 sale, 1 receipt, 1 expense", PRODUCTS.len());
    println!("  harbor:   empty");
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
