//! # Article Repository
//!
//! Registry of stock-keeping units. Each row carries the remaining stock
//! (`kg`) and the weight it was registered with (`income_kg`).
//!
//! Stock itself only moves through the [ledger](super::ledger); updates
//! here touch descriptive columns and never `kg`.

use sqlx::SqlitePool;
use stockroom_core::numeric::round_weight;
use stockroom_core::validation::validate_article;
use stockroom_core::{Article, ArticleInput};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

const ARTICLE_COLUMNS: &str =
    "service_id, id, no, code, description, euro, colli, kg, income_kg, value";

/// Repository for article database operations.
#[derive(Debug, Clone)]
pub struct ArticleRepository {
    pool: SqlitePool,
}

impl ArticleRepository {
    /// Creates a new ArticleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ArticleRepository { pool }
    }

    /// Registers an article. The given `kg` becomes both stock and income.
    pub async fn create(&self, input: &ArticleInput) -> DbResult<Article> {
        validate_article(input)?;
        let kg = round_weight(input.kg);

        let service_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO articles (id, no, code, description, euro, colli, kg, income_kg, value)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)
            RETURNING service_id
            "#,
        )
        .bind(input.id)
        .bind(&input.no)
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.euro)
        .bind(input.colli)
        .bind(kg)
        .bind(input.value)
        .fetch_one(&self.pool)
        .await?;

        info!(service_id, id = input.id, kg, "Article registered");

        self.get(service_id)
            .await?
            .ok_or_else(|| DbError::not_found("Article", service_id))
    }

    /// Gets an article by its surrogate key.
    pub async fn get(&self, service_id: i64) -> DbResult<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {} FROM articles WHERE service_id = ?1",
            ARTICLE_COLUMNS
        ))
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(article)
    }

    /// Lists all articles in registration order.
    pub async fn list(&self) -> DbResult<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(&format!(
            "SELECT {} FROM articles ORDER BY service_id",
            ARTICLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = articles.len(), "Listed articles");
        Ok(articles)
    }

    /// Updates descriptive columns. Stock (`kg`, `income_kg`) is untouched.
    pub async fn update_details(&self, service_id: i64, input: &ArticleInput) -> DbResult<Article> {
        validate_article(input)?;

        let result = sqlx::query(
            r#"
            UPDATE articles SET
                id = ?2,
                no = ?3,
                code = ?4,
                description = ?5,
                euro = ?6,
                colli = ?7,
                value = ?8
            WHERE service_id = ?1
            "#,
        )
        .bind(service_id)
        .bind(input.id)
        .bind(&input.no)
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.euro)
        .bind(input.colli)
        .bind(input.value)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Article", service_id));
        }

        debug!(service_id, "Article details updated");

        self.get(service_id)
            .await?
            .ok_or_else(|| DbError::not_found("Article", service_id))
    }

    /// Deletes an article.
    ///
    /// Fails with a foreign-key violation while any allocation references it.
    pub async fn delete(&self, service_id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM articles WHERE service_id = ?1")
            .bind(service_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Article", service_id));
        }

        info!(service_id, "Article deleted");
        Ok(())
    }

    /// Counts registered articles.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
