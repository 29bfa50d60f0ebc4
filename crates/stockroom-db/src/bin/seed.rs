//! # Seed Data Generator
//!
//! Populates a database with demo articles, products and one order.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockroom_dev.db
//! cargo run -p stockroom-db --bin seed
//!
//! # Specify database path
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db
//! ```
//!
//! Payment methods come from the initial migration; this tool only adds
//! stock data and is a no-op when articles already exist.

use std::env;

use stockroom_core::{AllocationInput, ArticleInput, OrderInput, PaymentInput, ProductInput};
use stockroom_db::{init_tracing, Database, DbConfig};

/// (code, description, euro per kg, kg in stock)
const ARTICLES: &[(&str, &str, f64, f64)] = &[
    ("WL-100", "Wool, grey", 4.50, 1250.0),
    ("WL-110", "Wool, white", 5.10, 980.0),
    ("CT-200", "Cotton, mixed", 3.20, 2400.0),
    ("LN-300", "Linen", 6.75, 310.5),
    ("SL-400", "Silk scraps", 19.90, 42.0),
];

/// Exchange rate used for demo products.
const DEMO_CURS: f64 = 98.5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path = "./stockroom_dev.db".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockroom_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockroom Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.articles().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} articles", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut service_ids = Vec::with_capacity(ARTICLES.len());
    for (index, (code, description, euro, kg)) in ARTICLES.iter().enumerate() {
        let article = db
            .articles()
            .create(&ArticleInput {
                id: 1000 + index as i64,
                no: (index + 1).to_string(),
                code: code.to_string(),
                description: description.to_string(),
                euro: *euro,
                colli: (kg / 25.0).ceil(),
                kg: *kg,
                value: euro * kg,
            })
            .await?;
        service_ids.push((article.service_id, *euro));
    }
    println!("✓ Created {} articles", service_ids.len());

    // Each product takes a slice of two neighbouring articles.
    let mut product_ids = Vec::new();
    for (index, pair) in service_ids.windows(2).enumerate() {
        let allocations = pair
            .iter()
            .map(|&(article, euro)| AllocationInput {
                article,
                curs: DEMO_CURS,
                price_euro: euro,
                weight: 10.0 + index as f64 * 2.5,
                count: 1,
            })
            .collect();

        let name = db.products().generate_name().await?;
        let product = db
            .products()
            .create(&ProductInput {
                status: 1,
                name,
                discount_percent: if index % 2 == 0 { 0.0 } else { 5.0 },
                count: 1,
                allocations,
                ..Default::default()
            })
            .await?;
        println!(
            "  Product {} {} ({} kg): {}",
            product.id, product.name, product.weight, product.discounted_price
        );
        product_ids.push(product.id);
    }
    println!("✓ Created {} products", product_ids.len());

    let order = db
        .orders()
        .create(&OrderInput {
            name: "Demo order".to_string(),
            status: 0,
            product_ids: product_ids.iter().take(2).copied().collect(),
            payments: vec![PaymentInput {
                method: "нал".to_string(),
                amount: 5000.0,
                ..Default::default()
            }],
            ..Default::default()
        })
        .await?;
    println!("✓ Created order {} with debt {}", order.id, order.debt);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
