//! # Article Ledger
//!
//! Moves stock weight in and out of article rows. Both operations run on
//! the caller's transaction and never commit themselves.
//!
//! ## Reserve
//! ```text
//! requested: { 2: 1.5 kg, 5: 3.0 kg }      (BTreeMap → ascending keys)
//!      │
//!      ▼
//! for each article, in key order:
//!      │
//!      ├── lock row:  UPDATE articles SET kg = kg … RETURNING kg
//!      │     └── no row → ArticleNotFound
//!      │
//!      ├── available + ε < requested → InsufficientStock
//!      │
//!      └── kg = ROUND(kg − requested, 6)
//! ```
//!
//! The no-op `UPDATE` takes SQLite's write lock before the stock is read,
//! so no other writer can slip in between the check and the decrement.
//! Visiting keys in ascending order keeps the lock order identical for
//! every caller.

use std::collections::BTreeMap;

use sqlx::SqliteConnection;
use stockroom_core::numeric::round_weight;
use stockroom_core::{CoreError, WEIGHT_EPSILON};
use tracing::debug;

use crate::error::DbResult;

/// Decrements stock for every `(service_id, kg)` entry.
///
/// ## Errors
/// - [`CoreError::ArticleNotFound`] when an article has no row
/// - [`CoreError::InsufficientStock`] when an article holds less than asked
///
/// On error the caller must drop its transaction; entries already visited
/// were decremented inside it.
pub async fn reserve(conn: &mut SqliteConnection, requested: &BTreeMap<i64, f64>) -> DbResult<()> {
    for (&article, &kg) in requested {
        let kg = round_weight(kg);
        if kg == 0.0 {
            continue;
        }

        let available: Option<f64> =
            sqlx::query_scalar("UPDATE articles SET kg = kg WHERE service_id = ?1 RETURNING kg")
                .bind(article)
                .fetch_optional(&mut *conn)
                .await?;

        let Some(available) = available else {
            return Err(CoreError::ArticleNotFound(article).into());
        };

        if available + WEIGHT_EPSILON < kg {
            debug!(article, available, requested = kg, "Reservation refused");
            return Err(CoreError::InsufficientStock {
                article,
                available,
                requested: kg,
            }
            .into());
        }

        sqlx::query("UPDATE articles SET kg = ROUND(kg - ?1, 6) WHERE service_id = ?2")
            .bind(kg)
            .bind(article)
            .execute(&mut *conn)
            .await?;

        debug!(article, kg, "Reserved stock");
    }

    Ok(())
}

/// Increments stock for every `(service_id, kg)` entry.
///
/// ## Errors
/// - [`CoreError::ArticleNotFound`] when an article has no row
pub async fn release(conn: &mut SqliteConnection, released: &BTreeMap<i64, f64>) -> DbResult<()> {
    for (&article, &kg) in released {
        let kg = round_weight(kg);
        if kg == 0.0 {
            continue;
        }

        let result = sqlx::query("UPDATE articles SET kg = ROUND(kg + ?1, 6) WHERE service_id = ?2")
            .bind(kg)
            .bind(article)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ArticleNotFound(article).into());
        }

        debug!(article, kg, "Released stock");
    }

    Ok(())
}

/// Sums the allocation weights a product currently holds, per article.
pub async fn held_by_product(conn: &mut SqliteConnection, product_id: i64) -> DbResult<BTreeMap<i64, f64>> {
    let rows: Vec<(i64, f64)> =
        sqlx::query_as("SELECT article, weight FROM article_in_product WHERE product_id = ?1")
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?;

    Ok(stockroom_core::pricing::requested_weights(rows))
}

// =============================================================================
// Unit Tests
// =============================================================================
