//! # Debt Recalculation
//!
//! Re-derives an order's `quantity` and `debt_cents` from the rows that
//! are persisted at the moment of the call:
//!
//! ```text
//! quantity = |order_products|
//! debt     = Σ products.discounted_price_cents − Σ payments_monitoring.amount_cents
//! ```
//!
//! Called inside the transaction of every operation that links or unlinks
//! products, re-prices a linked product, or touches an order's payments.

use sqlx::SqliteConnection;
use stockroom_core::debt::debt_from_amounts;
use stockroom_core::Money;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Recomputes and stores the debt of one order, returning the new value.
pub async fn recalculate(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Money> {
    let (quantity, owed): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(p.discounted_price_cents), 0)
        FROM order_products op
        JOIN products p ON p.id = op.product_id
        WHERE op.order_id = ?1
        "#,
    )
    .bind(order_id)
    .fetch_one(&mut *conn)
    .await?;

    let paid: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payments_monitoring WHERE order_id = ?1",
    )
    .bind(order_id)
    .fetch_one(&mut *conn)
    .await?;

    let debt = debt_from_amounts([Money::from_cents(owed)], [Money::from_cents(paid)]);

    let result = sqlx::query("UPDATE orders SET quantity = ?2, debt_cents = ?3 WHERE id = ?1")
        .bind(order_id)
        .bind(quantity)
        .bind(debt.cents())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", order_id));
    }

    debug!(order_id, quantity, debt = %debt, "Order debt recalculated");
    Ok(debt)
}

/// Recalculates every order currently holding `product_id`.
pub async fn recalculate_for_product(conn: &mut SqliteConnection, product_id: i64) -> DbResult<()> {
    let orders: Vec<i64> =
        sqlx::query_scalar("SELECT order_id FROM order_products WHERE product_id = ?1")
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?;

    for order_id in orders {
        recalculate(&mut *conn, order_id).await?;
    }
    Ok(())
}
