//! # Product Repository
//!
//! Composite products built from article allocations.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(input)                    update(id, input)                     │
//! │    validate                         validate                            │
//! │    BEGIN                            BEGIN                               │
//! │    reserve(requested)               release(held by product)            │
//! │    INSERT product                   reserve(requested)                  │
//! │    INSERT allocations               UPDATE product                      │
//! │    COMMIT                           replace allocations                 │
//! │                                     recalculate linked order debt       │
//! │                                     COMMIT                              │
//! │                                                                         │
//! │  delete(id)                                                             │
//! │    BEGIN, release(held), DELETE (cascades allocations + links),         │
//! │    recalculate formerly linked orders, COMMIT                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Derived prices are computed by `stockroom_core::pricing` from the
//! allocations and stored alongside them; reads return what was stored.
//!
//! [`ProductRepository::generate_name`] proposes a lot name (`к0427`) that
//! no stored product uses yet.

use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};
use stockroom_core::pricing::{compute_derived, requested_weights, DerivedFields};
use stockroom_core::naming::{random_lot_name, LOT_NAME_ATTEMPTS};
use stockroom_core::validation::validate_product;
use stockroom_core::{
    Allocation, AllocationInput, CoreError, Money, Product, ProductInput, ProductStatus,
};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, debt, ledger};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    status: ProductStatus,
    name: String,
    weight: f64,
    discount_percent: f64,
    total_price_cents: i64,
    discounted_price_cents: i64,
    unit_price_cents: i64,
    count: i64,
    video: String,
    description: String,
}

impl ProductRow {
    fn into_product(self, allocations: Vec<Allocation>) -> Product {
        Product {
            id: self.id,
            status: self.status,
            name: self.name,
            weight: self.weight,
            discount_percent: self.discount_percent,
            total_price: Money::from_cents(self.total_price_cents),
            discounted_price: Money::from_cents(self.discounted_price_cents),
            unit_price: Money::from_cents(self.unit_price_cents),
            count: self.count,
            video: self.video,
            description: self.description,
            allocations,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AllocationRow {
    id: i64,
    product_id: i64,
    article: i64,
    curs: f64,
    price_euro: f64,
    weight: f64,
    count: i64,
    sum_euro_cents: i64,
    sum_rub_cents: i64,
}

impl From<AllocationRow> for Allocation {
    fn from(row: AllocationRow) -> Self {
        Allocation {
            id: row.id,
            product_id: row.product_id,
            article: row.article,
            curs: row.curs,
            price_euro: row.price_euro,
            weight: row.weight,
            count: row.count,
            sum_euro: Money::from_cents(row.sum_euro_cents),
            sum_rub: Money::from_cents(row.sum_rub_cents),
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, status, name, weight, discount_percent, total_price_cents, \
     discounted_price_cents, unit_price_cents, count, video, description";

const ALLOCATION_COLUMNS: &str =
    "id, product_id, article, curs, price_euro, weight, count, sum_euro_cents, sum_rub_cents";

// =============================================================================
// Shared Helpers
// =============================================================================

/// Loads one product with its allocations.
pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {} FROM products WHERE id = ?1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let allocations = sqlx::query_as::<_, AllocationRow>(&format!(
        "SELECT {} FROM article_in_product WHERE product_id = ?1 ORDER BY id",
        ALLOCATION_COLUMNS
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(Allocation::from)
    .collect();

    Ok(Some(row.into_product(allocations)))
}

/// Sets the status of one product.
pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: ProductStatus,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE products SET status = ?2 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }
    Ok(())
}

async fn insert_allocations(
    conn: &mut SqliteConnection,
    product_id: i64,
    allocations: &[AllocationInput],
    derived: &DerivedFields,
) -> DbResult<()> {
    for (allocation, totals) in allocations.iter().zip(&derived.allocations) {
        sqlx::query(
            r#"
            INSERT INTO article_in_product (
                product_id, article, curs, price_euro, weight, count,
                sum_euro_cents, sum_rub_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(product_id)
        .bind(allocation.article)
        .bind(allocation.curs)
        .bind(allocation.price_euro)
        .bind(allocation.weight)
        .bind(allocation.count)
        .bind(totals.sum_euro.cents())
        .bind(totals.sum_rub.cents())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn requested(input: &ProductInput) -> std::collections::BTreeMap<i64, f64> {
    requested_weights(input.allocations.iter().map(|a| (a.article, a.weight)))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().create(&input).await?;
/// let product = db.products().update(product.id, &changed).await?;
/// db.products().delete(product.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product and reserves the stock of its allocations.
    ///
    /// ## Errors
    /// - `Validation` for bad input (nothing is written)
    /// - `ArticleNotFound` / `InsufficientStock` from the ledger
    pub async fn create(&self, input: &ProductInput) -> DbResult<Product> {
        let status = validate_product(input)?;
        let derived = compute_derived(input.discount_percent, &input.allocations);

        let mut tx = begin_write(&self.pool).await?;

        ledger::reserve(&mut tx, &requested(input)).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (
                status, name, weight, discount_percent,
                total_price_cents, discounted_price_cents, unit_price_cents,
                count, video, description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING id
            "#,
        )
        .bind(status)
        .bind(&input.name)
        .bind(derived.weight)
        .bind(derived.discount_percent)
        .bind(derived.total_price.cents())
        .bind(derived.discounted_price.cents())
        .bind(derived.unit_price.cents())
        .bind(input.count)
        .bind(&input.video)
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;

        insert_allocations(&mut tx, id, &input.allocations, &derived).await?;

        let product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        tx.commit().await?;

        info!(
            id,
            allocations = input.allocations.len(),
            total = %derived.total_price,
            "Product created"
        );
        Ok(product)
    }

    /// Replaces a product's allocations and figures.
    ///
    /// Previously held stock is released before the new stock is reserved,
    /// so an unchanged allocation list is always satisfiable. Orders holding
    /// the product get their debt recalculated.
    pub async fn update(&self, id: i64, input: &ProductInput) -> DbResult<Product> {
        let status = validate_product(input)?;
        let derived = compute_derived(input.discount_percent, &input.allocations);

        let mut tx = begin_write(&self.pool).await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Product", id));
        }

        let held = ledger::held_by_product(&mut tx, id).await?;
        ledger::release(&mut tx, &held).await?;
        ledger::reserve(&mut tx, &requested(input)).await?;

        sqlx::query(
            r#"
            UPDATE products SET
                status = ?2,
                name = ?3,
                weight = ?4,
                discount_percent = ?5,
                total_price_cents = ?6,
                discounted_price_cents = ?7,
                unit_price_cents = ?8,
                count = ?9,
                video = ?10,
                description = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(&input.name)
        .bind(derived.weight)
        .bind(derived.discount_percent)
        .bind(derived.total_price.cents())
        .bind(derived.discounted_price.cents())
        .bind(derived.unit_price.cents())
        .bind(input.count)
        .bind(&input.video)
        .bind(&input.description)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM article_in_product WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_allocations(&mut tx, id, &input.allocations, &derived).await?;

        debt::recalculate_for_product(&mut tx, id).await?;

        let product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        tx.commit().await?;

        info!(id, total = %derived.total_price, "Product updated");
        Ok(product)
    }

    /// Deletes a product, returning its stock to the articles.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let held = ledger::held_by_product(&mut tx, id).await?;
        let orders: Vec<i64> =
            sqlx::query_scalar("SELECT order_id FROM order_products WHERE product_id = ?1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        ledger::release(&mut tx, &held).await?;

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        for order_id in &orders {
            debt::recalculate(&mut tx, *order_id).await?;
        }

        tx.commit().await?;

        info!(id, released = held.len(), orders = orders.len(), "Product deleted");
        Ok(())
    }

    /// Gets a product with its allocations.
    pub async fn get(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Lists every product with its allocations, by id.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;

        let mut allocations: HashMap<i64, Vec<Allocation>> = HashMap::new();
        let all = sqlx::query_as::<_, AllocationRow>(&format!(
            "SELECT {} FROM article_in_product ORDER BY product_id, id",
            ALLOCATION_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;
        for row in all {
            allocations.entry(row.product_id).or_default().push(row.into());
        }

        let products: Vec<Product> = rows
            .into_iter()
            .map(|row| {
                let own = allocations.remove(&row.id).unwrap_or_default();
                row.into_product(own)
            })
            .collect();

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Counts products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Whether any product carries exactly this name.
    pub async fn name_exists(&self, name: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE name = ?1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Proposes a random lot name no stored product uses.
    ///
    /// The name is not reserved: a product created later with the same name
    /// is not prevented.
    pub async fn generate_name(&self) -> DbResult<String> {
        self.generate_name_with(|| random_lot_name(&mut rand::thread_rng()))
            .await
    }

    async fn generate_name_with(&self, mut candidate: impl FnMut() -> String) -> DbResult<String> {
        for _ in 0..LOT_NAME_ATTEMPTS {
            let name = candidate();
            if !self.name_exists(&name).await? {
                debug!(name = %name, "Generated product name");
                return Ok(name);
            }
        }

        warn!(attempts = LOT_NAME_ATTEMPTS, "Product name space exhausted");
        Err(CoreError::NameExhausted {
            attempts: LOT_NAME_ATTEMPTS,
        }
        .into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{allocation, product_input, seed_article, stock_of, test_db};
    use stockroom_core::{CoreError, ErrorKind};

    #[tokio::test]
    async fn test_create_reserves_stock_and_prices() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;

        let product = db
            .products()
            .create(&product_input(vec![allocation(a, 419.57, 1.0)]))
            .await
            .unwrap();

        assert!(product.id >= 6000);
        assert_eq!(product.status, ProductStatus::Available);
        assert_eq!(product.total_price.to_string(), "41957.00");
        assert_eq!(product.discounted_price.to_string(), "41957.00");
        assert_eq!(product.allocations.len(), 1);
        assert_eq!(product.allocations[0].sum_euro.to_string(), "419.57");
        assert_eq!(stock_of(&db, a).await, 9.0);
    }

    #[tokio::test]
    async fn test_create_insufficient_stock_writes_nothing() {
        let db = test_db().await;
        let a = seed_article(&db, 1.0).await;
        let b = seed_article(&db, 5.0).await;

        let input = product_input(vec![allocation(b, 1.0, 2.0), allocation(a, 1.0, 1.5)]);
        let err = db.products().create(&input).await.unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));
        assert_eq!(stock_of(&db, a).await, 1.0);
        assert_eq!(stock_of(&db, b).await, 5.0);
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_unknown_article() {
        let db = test_db().await;
        let err = db
            .products()
            .create(&product_input(vec![allocation(404, 1.0, 1.0)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArticleNotFound);
    }

    #[tokio::test]
    async fn test_create_validation_error() {
        let db = test_db().await;
        let mut input = product_input(vec![]);
        input.status = 9;
        let err = db.products().create(&input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_same_allocations_is_satisfiable() {
        let db = test_db().await;
        let a = seed_article(&db, 2.0).await;

        let input = product_input(vec![allocation(a, 10.0, 2.0)]);
        let product = db.products().create(&input).await.unwrap();
        assert_eq!(stock_of(&db, a).await, 0.0);

        // All of the stock is held by the product itself.
        let updated = db.products().update(product.id, &input).await.unwrap();
        assert_eq!(updated.total_price, product.total_price);
        assert_eq!(stock_of(&db, a).await, 0.0);
    }

    #[tokio::test]
    async fn test_update_moves_stock_between_articles() {
        let db = test_db().await;
        let a = seed_article(&db, 5.0).await;
        let b = seed_article(&db, 5.0).await;

        let product = db
            .products()
            .create(&product_input(vec![allocation(a, 1.0, 3.0)]))
            .await
            .unwrap();

        let mut changed = product_input(vec![allocation(b, 2.0, 1.5)]);
        changed.discount_percent = 10.0;
        let updated = db.products().update(product.id, &changed).await.unwrap();

        assert_eq!(stock_of(&db, a).await, 5.0);
        assert_eq!(stock_of(&db, b).await, 3.5);
        assert_eq!(updated.total_price.to_string(), "300.00");
        assert_eq!(updated.discounted_price.to_string(), "270.00");
        assert_eq!(updated.allocations.len(), 1);
        assert_eq!(updated.allocations[0].article, b);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_previous_state() {
        let db = test_db().await;
        let a = seed_article(&db, 5.0).await;
        let b = seed_article(&db, 1.0).await;

        let product = db
            .products()
            .create(&product_input(vec![allocation(a, 1.0, 3.0)]))
            .await
            .unwrap();

        let err = db
            .products()
            .update(product.id, &product_input(vec![allocation(b, 1.0, 2.0)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        assert_eq!(stock_of(&db, a).await, 2.0);
        assert_eq!(stock_of(&db, b).await, 1.0);
        let unchanged = db.products().get(product.id).await.unwrap().unwrap();
        assert_eq!(unchanged, product);
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = test_db().await;
        let err = db
            .products()
            .update(6000, &product_input(vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_restores_stock() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;

        let product = db
            .products()
            .create(&product_input(vec![allocation(a, 1.0, 2.5), allocation(a, 1.0, 1.25)]))
            .await
            .unwrap();
        assert_eq!(stock_of(&db, a).await, 6.25);

        db.products().delete(product.id).await.unwrap();
        assert_eq!(stock_of(&db, a).await, 10.0);
        assert_eq!(db.products().get(product.id).await.unwrap(), None);

        let err = db.products().delete(product.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_groups_allocations() {
        let db = test_db().await;
        let a = seed_article(&db, 10.0).await;

        let first = db
            .products()
            .create(&product_input(vec![allocation(a, 1.0, 1.0), allocation(a, 2.0, 1.0)]))
            .await
            .unwrap();
        let second = db
            .products()
            .create(&product_input(vec![]))
            .await
            .unwrap();

        let listed = db.products().list().await.unwrap();
        assert_eq!(listed, vec![first, second]);
    }

    #[tokio::test]
    async fn test_generate_name_is_unused_lot_name() {
        let db = test_db().await;
        let name = db.products().generate_name().await.unwrap();
        assert!(stockroom_core::naming::is_lot_name(&name));
        assert!(!db.products().name_exists(&name).await.unwrap());
    }

    #[tokio::test]
    async fn test_generate_name_skips_taken_names() {
        let db = test_db().await;
        let mut taken = product_input(vec![]);
        taken.name = "к0001".to_string();
        db.products().create(&taken).await.unwrap();
        assert!(db.products().name_exists("к0001").await.unwrap());

        let mut candidates = vec!["к0002", "к0001"];
        let name = db
            .products()
            .generate_name_with(|| candidates.pop().unwrap_or("x").to_string())
            .await
            .unwrap();
        assert_eq!(name, "к0002");
    }

    #[tokio::test]
    async fn test_generate_name_gives_up() {
        let db = test_db().await;
        let mut taken = product_input(vec![]);
        taken.name = "к0001".to_string();
        db.products().create(&taken).await.unwrap();

        let mut calls = 0;
        let err = db
            .products()
            .generate_name_with(|| {
                calls += 1;
                "к0001".to_string()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(calls, LOT_NAME_ATTEMPTS);
    }
}
