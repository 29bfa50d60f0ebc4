//! # stockroom-db: Database Layer for Stockroom
//!
//! SQLite persistence for articles, products, orders and payments. Every
//! mutating call runs in exactly one transaction; any error rolls all of
//! its writes back.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  Request layer (JSON in, ApiError out)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockroom-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Articles      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Products      │    │ 001_init.sql │  │   │
//! │  │   │ DbConfig      │    │ Orders        │    │              │  │   │
//! │  │   │               │    │ Payments      │    │              │  │   │
//! │  │   │               │    │ Balance       │    │ 002_clients  │  │   │
//! │  │   │               │    │ Clients       │    │              │  │   │
//! │  │   │               │    │ Shipments     │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ ledger / debt steps           │   │
//! │  └────────────────────────────────┼────────────────────────────────┘   │
//! │                                   ▼                                     │
//! │                   stockroom-core (pricing, validation, math)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let product = db.products().create(&input).await?;
//! let order = db.orders().create(&order_input).await?;
//! let report = db.balance().report().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ApiError, DbError, DbResult};
pub use pool::{ConfigError, Database, DbConfig};

pub use repository::article::ArticleRepository;
pub use repository::balance::BalanceRepository;
pub use repository::client::ClientRepository;
pub use repository::import::{ArticleImporter, ImportReport};
pub use repository::order::OrderRepository;
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
pub use repository::shipment::ShipmentRepository;

/// Installs the `tracing` subscriber used by the binaries.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockroom=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
