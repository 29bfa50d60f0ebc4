//! # Payment Repository
//!
//! The payment ledger (`payments_monitoring`) and the registry of accepted
//! payment methods.
//!
//! A payment may stand alone or belong to an order. Every write that
//! touches an order-linked payment recalculates that order's debt in the
//! same transaction.

use chrono::{DateTime, SubsecRound, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::payment_time::{date_range, parse_payment_date};
use stockroom_core::validation::validate_payment;
use stockroom_core::{Money, Payment, PaymentFilter, PaymentInput, PaymentMethod, ValidationError};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, debt};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    order_id: Option<i64>,
    paid_at: DateTime<Utc>,
    method: String,
    amount_cents: i64,
    comment: String,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            order_id: row.order_id,
            paid_at: row.paid_at,
            method: row.method,
            amount: Money::from_cents(row.amount_cents),
            comment: row.comment,
        }
    }
}

const PAYMENT_COLUMNS: &str = "id, order_id, paid_at, method, amount_cents, comment";

// =============================================================================
// Shared Helpers
// =============================================================================

/// Current time as stored on payments: UTC, whole seconds.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Names of every registered payment method.
pub(crate) async fn method_names(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
    let names = sqlx::query_scalar("SELECT method FROM payment_methods ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;
    Ok(names)
}

/// Inserts one payment row and returns its id. The input must already be
/// validated.
pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    order_id: Option<i64>,
    paid_at: DateTime<Utc>,
    input: &PaymentInput,
    amount: Money,
) -> DbResult<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO payments_monitoring (paid_at, method, order_id, amount_cents, comment)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id
        "#,
    )
    .bind(paid_at)
    .bind(input.method.trim())
    .bind(order_id)
    .bind(amount.cents())
    .bind(&input.comment)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Overwrites one payment of an order. Returns `false` when `id` is not a
/// payment of `order_id`.
pub(crate) async fn update_for_order(
    conn: &mut SqliteConnection,
    id: i64,
    order_id: i64,
    paid_at: DateTime<Utc>,
    input: &PaymentInput,
    amount: Money,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE payments_monitoring SET
            paid_at = ?3,
            method = ?4,
            amount_cents = ?5,
            comment = ?6
        WHERE id = ?1 AND order_id = ?2
        "#,
    )
    .bind(id)
    .bind(order_id)
    .bind(paid_at)
    .bind(input.method.trim())
    .bind(amount.cents())
    .bind(&input.comment)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Payments of one order, oldest first.
pub(crate) async fn fetch_for_order(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Vec<Payment>> {
    let rows = sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {} FROM payments_monitoring WHERE order_id = ?1 ORDER BY paid_at, id",
        PAYMENT_COLUMNS
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Payment::from).collect())
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Payment>> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {} FROM payments_monitoring WHERE id = ?1",
        PAYMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Payment::from))
}

async fn ensure_order(conn: &mut SqliteConnection, order_id: i64) -> DbResult<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE id = ?1")
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| DbError::not_found("Order", order_id))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the payment ledger.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a payment. A blank date means "now".
    ///
    /// When `order_id` is set the order must exist and its debt is
    /// recalculated.
    pub async fn record(&self, input: &PaymentInput) -> DbResult<Payment> {
        let mut tx = begin_write(&self.pool).await?;

        let registry = method_names(&mut tx).await?;
        let amount = validate_payment(input, &registry)?;
        let paid_at = parse_payment_date(&input.date, now())?;

        if let Some(order_id) = input.order_id {
            ensure_order(&mut tx, order_id).await?;
        }

        let id = insert(&mut tx, input.order_id, paid_at, input, amount).await?;

        if let Some(order_id) = input.order_id {
            debt::recalculate(&mut tx, order_id).await?;
        }

        let payment = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", id))?;

        tx.commit().await?;

        info!(id, order_id = ?input.order_id, amount = %amount, "Payment recorded");
        Ok(payment)
    }

    /// Updates date, method, amount and comment of a payment. Its order
    /// link is kept.
    pub async fn update(&self, id: i64, input: &PaymentInput) -> DbResult<Payment> {
        let mut tx = begin_write(&self.pool).await?;

        let existing = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", id))?;

        let registry = method_names(&mut tx).await?;
        let amount = validate_payment(input, &registry)?;
        let paid_at = parse_payment_date(&input.date, now())?;

        sqlx::query(
            r#"
            UPDATE payments_monitoring SET
                paid_at = ?2,
                method = ?3,
                amount_cents = ?4,
                comment = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(paid_at)
        .bind(input.method.trim())
        .bind(amount.cents())
        .bind(&input.comment)
        .execute(&mut *tx)
        .await?;

        if let Some(order_id) = existing.order_id {
            debt::recalculate(&mut tx, order_id).await?;
        }

        let payment = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", id))?;

        tx.commit().await?;

        debug!(id, amount = %amount, "Payment updated");
        Ok(payment)
    }

    /// Deletes a payment.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let existing = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", id))?;

        sqlx::query("DELETE FROM payments_monitoring WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if let Some(order_id) = existing.order_id {
            debt::recalculate(&mut tx, order_id).await?;
        }

        tx.commit().await?;

        info!(id, "Payment deleted");
        Ok(())
    }

    /// Gets a payment by id.
    pub async fn get(&self, id: i64) -> DbResult<Option<Payment>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Lists payments, newest first, filtered by method and date bounds.
    ///
    /// Date-only bounds cover whole days: `dateTo = 2024-03-31` includes
    /// 23:59:59 on that day.
    pub async fn list(&self, filter: &PaymentFilter) -> DbResult<Vec<Payment>> {
        let range = date_range(filter.date_from.as_deref(), filter.date_to.as_deref())?;
        let method = filter
            .method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());

        let mut sql = format!("SELECT {} FROM payments_monitoring WHERE 1 = 1", PAYMENT_COLUMNS);
        if method.is_some() {
            sql.push_str(" AND method = ?");
        }
        if range.from.is_some() {
            sql.push_str(" AND paid_at >= ?");
        }
        if range.to.is_some() {
            sql.push_str(" AND paid_at <= ?");
        }
        sql.push_str(" ORDER BY paid_at DESC, id DESC");

        let mut query = sqlx::query_as::<_, PaymentRow>(&sql);
        if let Some(method) = method {
            query = query.bind(method);
        }
        if let Some(from) = range.from {
            query = query.bind(from);
        }
        if let Some(to) = range.to {
            query = query.bind(to);
        }

        let payments: Vec<Payment> = query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Payment::from)
            .collect();

        debug!(count = payments.len(), "Listed payments");
        Ok(payments)
    }

    /// Lists registered payment methods.
    pub async fn methods(&self) -> DbResult<Vec<PaymentMethod>> {
        let methods = sqlx::query_as::<_, PaymentMethod>(
            "SELECT id, method FROM payment_methods ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(methods)
    }

    /// Registers a payment method.
    pub async fn add_method(&self, name: &str) -> DbResult<PaymentMethod> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Required {
                field: "method".to_string(),
            }
            .into());
        }

        let mut tx = begin_write(&self.pool).await?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM payment_methods WHERE method = ?1")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(DbError::duplicate("method", name));
        }

        let method = sqlx::query_as::<_, PaymentMethod>(
            "INSERT INTO payment_methods (method) VALUES (?1) RETURNING id, method",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(method = %method.method, "Payment method registered");
        Ok(method)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{empty_order, test_db};
    use chrono::TimeZone;
    use stockroom_core::ErrorKind;

    fn payment(method: &str, amount: f64, date: &str) -> PaymentInput {
        PaymentInput {
            method: method.to_string(),
            amount,
            date: date.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_seeded_methods() {
        let db = test_db().await;
        let methods = db.payments().methods().await.unwrap();
        assert_eq!(methods.len(), 13);
        assert!(methods.iter().any(|m| m.method == "нал"));
    }

    #[tokio::test]
    async fn test_add_method() {
        let db = test_db().await;
        let added = db.payments().add_method("  крипто ").await.unwrap();
        assert_eq!(added.method, "крипто");

        let err = db.payments().add_method("крипто").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(db.payments().add_method(" ").await.unwrap_err().kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_record_standalone_payment() {
        let db = test_db().await;
        let recorded = db
            .payments()
            .record(&payment("втб", 1500.5, "01-03-2024 14:30:00"))
            .await
            .unwrap();

        assert_eq!(recorded.order_id, None);
        assert_eq!(recorded.amount.to_string(), "1500.50");
        assert_eq!(recorded.paid_at, Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap());
        assert_eq!(db.payments().get(recorded.id).await.unwrap(), Some(recorded));
    }

    #[tokio::test]
    async fn test_record_blank_date_is_now() {
        let db = test_db().await;
        let before = now();
        let recorded = db.payments().record(&payment("нал", 10.0, "")).await.unwrap();
        assert!(recorded.paid_at >= before);
        assert_eq!(recorded.paid_at.timestamp_subsec_nanos(), 0);
    }

    #[tokio::test]
    async fn test_record_rejects_bad_input() {
        let db = test_db().await;
        let payments = db.payments();

        let err = payments.record(&payment("bitcoin", 10.0, "")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = payments.record(&payment("нал", -5.0, "")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = payments.record(&payment("нал", 5.0, "tomorrow")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut linked = payment("нал", 5.0, "");
        linked.order_id = Some(404);
        assert_eq!(payments.record(&linked).await.unwrap_err().kind(), ErrorKind::NotFound);

        assert!(payments.list(&PaymentFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_linked_payment_moves_debt() {
        let db = test_db().await;
        let order = empty_order(&db).await;

        let mut input = payment("нал", 250.0, "");
        input.order_id = Some(order);
        let recorded = db.payments().record(&input).await.unwrap();
        let loaded = db.orders().get(order).await.unwrap().unwrap();
        assert_eq!(loaded.debt.to_string(), "-250.00");

        input.amount = 100.0;
        db.payments().update(recorded.id, &input).await.unwrap();
        let loaded = db.orders().get(order).await.unwrap().unwrap();
        assert_eq!(loaded.debt.to_string(), "-100.00");

        db.payments().delete(recorded.id).await.unwrap();
        let loaded = db.orders().get(order).await.unwrap().unwrap();
        assert_eq!(loaded.debt, Money::zero());
        assert!(loaded.payments.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let db = test_db().await;
        let input = payment("нал", 1.0, "");
        assert_eq!(db.payments().update(77, &input).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(db.payments().delete(77).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        let payments = db.payments();
        payments.record(&payment("нал", 1.0, "2024-03-01 10:00:00")).await.unwrap();
        payments.record(&payment("втб", 2.0, "2024-03-15")).await.unwrap();
        payments.record(&payment("нал", 3.0, "2024-03-31 23:00:00")).await.unwrap();
        payments.record(&payment("нал", 4.0, "2024-04-01")).await.unwrap();

        let all = payments.list(&PaymentFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].amount.to_string(), "4.00");

        let cash = payments
            .list(&PaymentFilter {
                method: Some("нал".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cash.len(), 3);

        let march = payments
            .list(&PaymentFilter {
                date_from: Some("2024-03-01".to_string()),
                date_to: Some("2024-03-31".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            march.iter().map(|p| p.amount.to_string()).collect::<Vec<_>>(),
            vec!["3.00", "2.00", "1.00"]
        );

        let err = payments
            .list(&PaymentFilter {
                date_from: Some("March".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
