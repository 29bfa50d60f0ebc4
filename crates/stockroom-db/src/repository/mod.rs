//! # Repository Module
//!
//! Database repository implementations for Stockroom.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Public repositories (own their transaction per call)                   │
//! │                                                                         │
//! │  ArticleRepository   registry CRUD                                      │
//! │  ProductRepository   create / update / delete, reserve & release,       │
//! │                      lot name generation                                │
//! │  OrderRepository     create / update / delete, status machine           │
//! │  PaymentRepository   ledger + payment-method registry                   │
//! │  BalanceRepository   per-article stock report                           │
//! │  ArticleImporter     CSV bulk load                                      │
//! │  ClientRepository    customer cards                                     │
//! │  ShipmentRepository  shipping journal + per-day notes                   │
//! │       │                                                                 │
//! │       │  &mut SqliteConnection (the caller's transaction)               │
//! │       ▼                                                                 │
//! │  Shared steps (never commit)                                            │
//! │                                                                         │
//! │  ledger::reserve / ledger::release                                      │
//! │  debt::recalculate                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating call opens its transaction with [`begin_write`].

pub mod article;
pub mod balance;
pub mod client;
pub mod debt;
pub mod import;
pub mod ledger;
pub mod order;
pub mod payment;
pub mod product;
pub mod shipment;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;

/// Opens a transaction that holds the database write lock from its first
/// statement.
///
/// A deferred `BEGIN` that reads before writing cannot upgrade its lock
/// while another writer is active and fails with `SQLITE_BUSY` without
/// waiting. `BEGIN IMMEDIATE` takes the lock up front, so concurrent
/// writers queue on `busy_timeout` instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
