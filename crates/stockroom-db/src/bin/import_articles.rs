//! # Article Import Tool
//!
//! Loads articles from a CSV export.
//!
//! ## Usage
//! ```bash
//! cargo run -p stockroom-db --bin import-articles -- --file ./prihod.csv
//!
//! # Replace every article (refused while products reference them)
//! cargo run -p stockroom-db --bin import-articles -- --file ./prihod.csv --truncate
//! ```
//!
//! The database comes from `--db`, else from `STOCKROOM_DB_*`.

use std::env;
use std::fs;

use stockroom_db::{init_tracing, Database, DbConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut file_path = "./prihod.csv".to_string();
    let mut db_path: Option<String> = None;
    let mut truncate = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    file_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--truncate" => truncate = true,
            "--help" | "-h" => {
                println!("Stockroom Article Import");
                println!();
                println!("Usage: import-articles [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -f, --file <PATH>  CSV file to import (default: ./prihod.csv)");
                println!("  -d, --db <PATH>    Database file path (default: $STOCKROOM_DB_PATH)");
                println!("      --truncate     Delete existing articles first");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => DbConfig::from_env()?,
    };

    let text = fs::read_to_string(&file_path)?;
    let db = Database::new(config).await?;

    let report = db.importer().import_csv(&text, truncate).await?;

    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        file = %file_path,
        "Import finished"
    );
    println!(
        "Import complete: inserted={} skipped={} file={}",
        report.inserted, report.skipped, file_path
    );

    db.close().await;
    Ok(())
}
