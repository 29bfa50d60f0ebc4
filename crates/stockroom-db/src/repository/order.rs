//! # Order Repository
//!
//! Orders group products for one customer, carry shipment details and the
//! payments made against them.
//!
//! ## Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order status          Linked product status                            │
//! │  ────────────          ─────────────────────                            │
//! │  NEW (0)           ──► RESERVED                                         │
//! │  READY_TO_SHIP (1) ──► RESERVED                                         │
//! │  SHIPPED (2)       ──► SOLD                                             │
//! │                                                                         │
//! │  update():                                                              │
//! │    product dropped from the order   → AVAILABLE                         │
//! │    product added to the order       → status implied by order status    │
//! │    order enters SHIPPED             → every linked product SOLD         │
//! │                                                                         │
//! │  delete():  every linked product    → AVAILABLE                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Path
//! ```text
//! validate input ─► BEGIN ─► validate payments against registry
//!                         ─► validate product selection
//!                         ─► write order, links, product statuses
//!                         ─► reconcile payments
//!                         ─► recalculate debt ─► COMMIT
//! ```
//! Any failure drops the transaction, so a rejected request leaves every
//! row as it was.

use std::collections::{BTreeSet, HashSet};

use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::debt::{debt, enters_shipped, target_status};
use stockroom_core::validation::{check_selection, validate_order, validate_payment, ProductLink};
use stockroom_core::{
    Money, Order, OrderInput, OrderStatus, PaymentInput, ProductStatus, ShipmentDetails,
};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::product::{fetch_product, set_status};
use crate::repository::{begin_write, debt as order_debt, payment};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    name: String,
    description: String,
    status: OrderStatus,
    ship_date: String,
    city: String,
    full_name: String,
    phone: String,
    passport_inn: String,
    carrier: String,
    places: i64,
    price: f64,
    weight: f64,
}

const ORDER_COLUMNS: &str = "id, name, description, status, ship_date, city, full_name, \
     phone, passport_inn, carrier, places, price, weight";

// =============================================================================
// Helpers
// =============================================================================

/// Loads an order with its products and payments.
///
/// Quantity and debt are derived from the loaded rows.
async fn fetch_order(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {} FROM orders WHERE id = ?1",
        ORDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut products = Vec::new();
    for product_id in linked_products(conn, id).await? {
        let product = fetch_product(conn, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        products.push(product);
    }
    let payments = payment::fetch_for_order(conn, id).await?;

    Ok(Some(Order {
        id: row.id,
        name: row.name,
        description: row.description,
        status: row.status,
        shipment: ShipmentDetails {
            ship_date: row.ship_date,
            city: row.city,
            full_name: row.full_name,
            phone: row.phone,
            passport_inn: row.passport_inn,
            carrier: row.carrier,
            places: row.places,
            price: row.price,
            weight: row.weight,
        },
        quantity: products.len() as i64,
        debt: debt(&products, &payments),
        products,
        payments,
    }))
}

/// Product ids linked to an order, ascending.
async fn linked_products(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT product_id FROM order_products WHERE order_id = ?1 ORDER BY product_id",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

/// Loads what [`check_selection`] needs to know about each requested product.
///
/// ## Errors
/// `NotFound` for the first id that has no product row.
async fn selection_snapshot(conn: &mut SqliteConnection, ids: &[i64]) -> DbResult<Vec<ProductLink>> {
    let mut links = Vec::with_capacity(ids.len());
    for &product_id in ids {
        let row: Option<(ProductStatus, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT p.status, op.order_id
            FROM products p
            LEFT JOIN order_products op ON op.product_id = p.id
            WHERE p.id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        let (status, linked_order) = row.ok_or_else(|| DbError::not_found("Product", product_id))?;
        links.push(ProductLink {
            product_id,
            status,
            linked_order,
        });
    }
    Ok(links)
}

/// Validates every payment against the registry, in request order.
async fn validate_payments(
    conn: &mut SqliteConnection,
    payments: &[PaymentInput],
) -> DbResult<Vec<Money>> {
    if payments.is_empty() {
        return Ok(Vec::new());
    }
    let registry = payment::method_names(conn).await?;
    let amounts = payments
        .iter()
        .map(|p| validate_payment(p, &registry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(amounts)
}

async fn link_product(conn: &mut SqliteConnection, order_id: i64, product_id: i64) -> DbResult<()> {
    sqlx::query("INSERT INTO order_products (order_id, product_id) VALUES (?1, ?2)")
        .bind(order_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn write_header(
    conn: &mut SqliteConnection,
    order_id: i64,
    input: &OrderInput,
    status: OrderStatus,
) -> DbResult<()> {
    let s = &input.shipment;
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            name = ?2,
            description = ?3,
            status = ?4,
            ship_date = ?5,
            city = ?6,
            full_name = ?7,
            phone = ?8,
            passport_inn = ?9,
            carrier = ?10,
            places = ?11,
            price = ?12,
            weight = ?13
        WHERE id = ?1
        "#,
    )
    .bind(order_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(status)
    .bind(&s.ship_date)
    .bind(&s.city)
    .bind(&s.full_name)
    .bind(&s.phone)
    .bind(&s.passport_inn)
    .bind(&s.carrier)
    .bind(s.places)
    .bind(s.price)
    .bind(s.weight)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", order_id));
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order, links its products and records its payments.
    ///
    /// Every product must be AVAILABLE and unlinked. Linked products become
    /// RESERVED, or SOLD when the order is created as SHIPPED. Payments are
    /// stamped with the current time.
    pub async fn create(&self, input: &OrderInput) -> DbResult<Order> {
        let (status, product_ids) = validate_order(input)?;

        let mut tx = begin_write(&self.pool).await?;

        let amounts = validate_payments(&mut tx, &input.payments).await?;
        let candidates = selection_snapshot(&mut tx, &product_ids).await?;
        check_selection(0, &candidates, &HashSet::new())?;

        let order_id: i64 = sqlx::query_scalar("INSERT INTO orders (name) VALUES ('') RETURNING id")
            .fetch_one(&mut *tx)
            .await?;
        write_header(&mut tx, order_id, input, status).await?;

        let product_status = target_status(status);
        for &product_id in &product_ids {
            link_product(&mut tx, order_id, product_id).await?;
            set_status(&mut tx, product_id, product_status).await?;
        }

        let paid_at = payment::now();
        for (p, amount) in input.payments.iter().zip(amounts) {
            payment::insert(&mut tx, Some(order_id), paid_at, p, amount).await?;
        }

        let debt = order_debt::recalculate(&mut tx, order_id).await?;

        let order = fetch_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;

        tx.commit().await?;

        info!(
            order_id,
            products = product_ids.len(),
            payments = input.payments.len(),
            debt = %debt,
            "Order created"
        );
        Ok(order)
    }

    /// Replaces an order's header, product set and payments.
    ///
    /// ## Payment Reconciliation
    /// - `id > 0` naming a payment of this order: overwritten
    /// - any other id: inserted as a new payment
    /// - existing payments not named in the request: deleted
    pub async fn update(&self, id: i64, input: &OrderInput) -> DbResult<Order> {
        let (status, product_ids) = validate_order(input)?;

        let mut tx = begin_write(&self.pool).await?;

        let old_status: Option<OrderStatus> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let old_status = old_status.ok_or_else(|| DbError::not_found("Order", id))?;

        let amounts = validate_payments(&mut tx, &input.payments).await?;

        let old_ids: BTreeSet<i64> = linked_products(&mut tx, id).await?.into_iter().collect();
        let already_linked: HashSet<i64> = old_ids.iter().copied().collect();
        let candidates = selection_snapshot(&mut tx, &product_ids).await?;
        check_selection(id, &candidates, &already_linked)?;

        let new_ids: BTreeSet<i64> = product_ids.iter().copied().collect();

        for &removed in old_ids.difference(&new_ids) {
            set_status(&mut tx, removed, ProductStatus::Available).await?;
        }
        let product_status = target_status(status);
        for &added in new_ids.difference(&old_ids) {
            set_status(&mut tx, added, product_status).await?;
        }
        if enters_shipped(old_status, status) {
            for &product_id in &new_ids {
                set_status(&mut tx, product_id, ProductStatus::Sold).await?;
            }
        }

        sqlx::query("DELETE FROM order_products WHERE order_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for &product_id in &product_ids {
            link_product(&mut tx, id, product_id).await?;
        }

        write_header(&mut tx, id, input, status).await?;

        let existing: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM payments_monitoring WHERE order_id = ?1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        let paid_at = payment::now();
        let mut kept = HashSet::with_capacity(input.payments.len());
        for (p, amount) in input.payments.iter().zip(amounts) {
            let updated = p.id > 0
                && payment::update_for_order(&mut tx, p.id, id, paid_at, p, amount).await?;
            let payment_id = if updated {
                p.id
            } else {
                payment::insert(&mut tx, Some(id), paid_at, p, amount).await?
            };
            kept.insert(payment_id);
        }
        for stale in existing.into_iter().filter(|pid| !kept.contains(pid)) {
            sqlx::query("DELETE FROM payments_monitoring WHERE id = ?1")
                .bind(stale)
                .execute(&mut *tx)
                .await?;
            debug!(order_id = id, payment_id = stale, "Dropped payment");
        }

        let debt = order_debt::recalculate(&mut tx, id).await?;

        let order = fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        tx.commit().await?;

        info!(
            order_id = id,
            from = old_status.code(),
            to = status.code(),
            debt = %debt,
            "Order updated"
        );
        Ok(order)
    }

    /// Deletes an order and frees its products. Its payments stay in the
    /// ledger without an order.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let linked = linked_products(&mut tx, id).await?;
        for &product_id in &linked {
            set_status(&mut tx, product_id, ProductStatus::Available).await?;
        }

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        tx.commit().await?;

        info!(order_id = id, freed = linked.len(), "Order deleted");
        Ok(())
    }

    /// Gets an order with its products and payments.
    pub async fn get(&self, id: i64) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id).await
    }

    /// Lists every order, by id.
    pub async fn list(&self) -> DbResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;

        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM orders ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = fetch_order(&mut conn, id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// Stored debt of an order, as last written by a recalculation.
    pub async fn stored_debt(&self, id: i64) -> DbResult<Money> {
        let cents: Option<i64> = sqlx::query_scalar("SELECT debt_cents FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        cents
            .map(Money::from_cents)
            .ok_or_else(|| DbError::not_found("Order", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{allocation, product_input, seed_article, stock_of, test_db};
    use crate::Database;
    use stockroom_core::{CoreError, ErrorKind};

    async fn priced_product(db: &Database, article: i64, price_euro: f64) -> i64 {
        db.products()
            .create(&product_input(vec![allocation(article, price_euro, 1.0)]))
            .await
            .unwrap()
            .id
    }

    async fn product_status(db: &Database, id: i64) -> ProductStatus {
        db.products().get(id).await.unwrap().unwrap().status
    }

    fn order_input(status: i64, product_ids: Vec<i64>, payments: Vec<PaymentInput>) -> OrderInput {
        OrderInput {
            name: "Order".to_string(),
            status,
            product_ids,
            payments,
            ..Default::default()
        }
    }

    fn cash(amount: f64) -> PaymentInput {
        PaymentInput {
            method: "нал".to_string(),
            amount,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_reserves_products_and_computes_debt() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;
        let p1 = priced_product(&db, a, 419.57).await;
        let p2 = priced_product(&db, a, 384.02).await;

        let order = db
            .orders()
            .create(&order_input(0, vec![p1, p2], vec![cash(10000.0)]))
            .await
            .unwrap();

        assert_eq!(order.quantity, 2);
        assert_eq!(order.debt.to_string(), "70359.00");
        assert_eq!(db.orders().stored_debt(order.id).await.unwrap(), order.debt);
        assert_eq!(order.payments.len(), 1);
        assert_eq!(order.payments[0].order_id, Some(order.id));
        assert_eq!(product_status(&db, p1).await, ProductStatus::Reserved);
        assert_eq!(product_status(&db, p2).await, ProductStatus::Reserved);
    }

    #[tokio::test]
    async fn test_create_shipped_sells_products() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;
        let p = priced_product(&db, a, 1.0).await;

        db.orders().create(&order_input(2, vec![p], vec![])).await.unwrap();
        assert_eq!(product_status(&db, p).await, ProductStatus::Sold);
    }

    #[tokio::test]
    async fn test_product_conflict_leaves_everything_unchanged() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;
        let p = priced_product(&db, a, 1.0).await;
        let free = priced_product(&db, a, 1.0).await;

        let first = db.orders().create(&order_input(0, vec![p], vec![])).await.unwrap();

        let err = db
            .orders()
            .create(&order_input(0, vec![free, p], vec![cash(5.0)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::ProductConflict { product, order }) if product == p && order == first.id
        ));

        assert_eq!(db.orders().list().await.unwrap().len(), 1);
        assert_eq!(product_status(&db, free).await, ProductStatus::Available);
        assert!(db.payments().list(&Default::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_unavailable_and_missing_products() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;

        let mut sold = product_input(vec![allocation(a, 1.0, 1.0)]);
        sold.status = 3;
        let sold = db.products().create(&sold).await.unwrap().id;

        let err = db.orders().create(&order_input(0, vec![sold], vec![])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductUnavailable);

        let err = db.orders().create(&order_input(0, vec![404], vec![])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_payments_before_writing() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;
        let p = priced_product(&db, a, 1.0).await;

        let mut bad = cash(10.0);
        bad.method = "bitcoin".to_string();
        let err = db
            .orders()
            .create(&order_input(0, vec![p], vec![cash(1.0), bad]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(product_status(&db, p).await, ProductStatus::Available);
        assert!(db.orders().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_order_is_allowed() {
        let db = test_db().await;
        let order = db.orders().create(&order_input(1, vec![], vec![])).await.unwrap();
        assert_eq!(order.status, OrderStatus::ReadyToShip);
        assert_eq!(order.quantity, 0);
        assert_eq!(order.debt, Money::zero());
    }

    #[tokio::test]
    async fn test_update_swaps_products() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;
        let p1 = priced_product(&db, a, 1.0).await;
        let p2 = priced_product(&db, a, 2.0).await;

        let order = db.orders().create(&order_input(0, vec![p1], vec![])).await.unwrap();
        let updated = db
            .orders()
            .update(order.id, &order_input(1, vec![p2], vec![]))
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::ReadyToShip);
        assert_eq!(updated.products.iter().map(|p| p.id).collect::<Vec<_>>(), vec![p2]);
        assert_eq!(updated.debt.to_string(), "200.00");
        assert_eq!(product_status(&db, p1).await, ProductStatus::Available);
        assert_eq!(product_status(&db, p2).await, ProductStatus::Reserved);
    }

    #[tokio::test]
    async fn test_ready_to_shipped_sells_every_product() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;
        let kept = priced_product(&db, a, 1.0).await;
        let added = priced_product(&db, a, 1.0).await;

        let order = db.orders().create(&order_input(1, vec![kept], vec![])).await.unwrap();
        let shipped = db
            .orders()
            .update(order.id, &order_input(2, vec![kept, added], vec![]))
            .await
            .unwrap();

        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(shipped.products.iter().all(|p| p.status == ProductStatus::Sold));
        assert_eq!(product_status(&db, kept).await, ProductStatus::Sold);
        assert_eq!(product_status(&db, added).await, ProductStatus::Sold);
    }

    #[tokio::test]
    async fn test_update_reconciles_payments() {
        let db = test_db().await;
        let order = db
            .orders()
            .create(&order_input(0, vec![], vec![cash(100.0), cash(50.0)]))
            .await
            .unwrap();
        let first = order.payments[0].id;
        let second = order.payments[1].id;

        let mut edited = cash(70.0);
        edited.id = first;
        let mut foreign = cash(5.0);
        foreign.id = 9999;

        let updated = db
            .orders()
            .update(order.id, &order_input(0, vec![], vec![edited, foreign]))
            .await
            .unwrap();

        let ids: Vec<i64> = updated.payments.iter().map(|p| p.id).collect();
        assert!(ids.contains(&first));
        assert!(!ids.contains(&second));
        assert!(!ids.contains(&9999));
        assert_eq!(updated.payments.len(), 2);
        assert_eq!(updated.debt.to_string(), "-75.00");
        assert_eq!(db.payments().get(second).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_conflict_rolls_back() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;
        let p1 = priced_product(&db, a, 1.0).await;
        let p2 = priced_product(&db, a, 1.0).await;

        let first = db.orders().create(&order_input(0, vec![p1], vec![])).await.unwrap();
        let second = db.orders().create(&order_input(0, vec![p2], vec![])).await.unwrap();

        let err = db
            .orders()
            .update(second.id, &order_input(2, vec![p2, p1], vec![cash(1.0)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductConflict);

        let reloaded = db.orders().get(second.id).await.unwrap().unwrap();
        assert_eq!(reloaded, second);
        assert_eq!(db.orders().get(first.id).await.unwrap().unwrap(), first);
        assert_eq!(product_status(&db, p2).await, ProductStatus::Reserved);
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let db = test_db().await;
        let err = db
            .orders()
            .update(404, &order_input(0, vec![], vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_frees_products_and_keeps_payments() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;
        let p = priced_product(&db, a, 1.0).await;

        let order = db
            .orders()
            .create(&order_input(2, vec![p], vec![cash(10.0)]))
            .await
            .unwrap();
        db.orders().delete(order.id).await.unwrap();

        assert_eq!(product_status(&db, p).await, ProductStatus::Available);
        assert_eq!(db.orders().get(order.id).await.unwrap(), None);
        let payments = db.payments().list(&Default::default()).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].order_id, None);
        // stock is owned by the product, not the order
        assert_eq!(stock_of(&db, a).await, 9.0);

        assert_eq!(db.orders().delete(order.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_product_changes_move_order_debt() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;
        let p = priced_product(&db, a, 1.0).await;
        let order = db.orders().create(&order_input(0, vec![p], vec![])).await.unwrap();
        assert_eq!(order.debt.to_string(), "100.00");

        let mut repriced = product_input(vec![allocation(a, 3.0, 1.0)]);
        repriced.status = 2;
        db.products().update(p, &repriced).await.unwrap();
        assert_eq!(db.orders().stored_debt(order.id).await.unwrap().to_string(), "300.00");
        assert_eq!(stock_of(&db, a).await, 9.0);

        db.products().delete(p).await.unwrap();
        assert_eq!(stock_of(&db, a).await, 10.0);
        let reloaded = db.orders().get(order.id).await.unwrap().unwrap();
        assert_eq!(reloaded.quantity, 0);
        assert_eq!(db.orders().stored_debt(order.id).await.unwrap(), Money::zero());
    }
}
