//! # Balance Reporter
//!
//! Per-article stock report, aggregated from allocation rows by the status
//! of the product that holds them. AVAILABLE products count as neither
//! sent nor reserved.

use sqlx::SqlitePool;
use stockroom_core::balance::{ArticleBalance, ArticleFlows};
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct FlowRow {
    service_id: i64,
    id: i64,
    code: String,
    description: String,
    income: f64,
    sent: f64,
    reserved: f64,
}

impl From<FlowRow> for ArticleFlows {
    fn from(row: FlowRow) -> Self {
        ArticleFlows {
            service_id: row.service_id,
            id: row.id,
            code: row.code,
            description: row.description,
            income: row.income,
            sent: row.sent,
            reserved: row.reserved,
        }
    }
}

const FLOWS_SQL: &str = r#"
    SELECT
        a.service_id,
        a.id,
        a.code,
        a.description,
        a.income_kg AS income,
        COALESCE(SUM(CASE WHEN p.status = 3 THEN aip.weight END), 0.0) AS sent,
        COALESCE(SUM(CASE WHEN p.status = 2 THEN aip.weight END), 0.0) AS reserved
    FROM articles a
    LEFT JOIN article_in_product aip ON aip.article = a.service_id
    LEFT JOIN products p ON p.id = aip.product_id
"#;

/// Read-only balance queries.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    pool: SqlitePool,
}

impl BalanceRepository {
    /// Creates a new BalanceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BalanceRepository { pool }
    }

    /// One row per article, in registration order.
    pub async fn report(&self) -> DbResult<Vec<ArticleBalance>> {
        let rows = sqlx::query_as::<_, FlowRow>(&format!(
            "{} GROUP BY a.service_id ORDER BY a.service_id",
            FLOWS_SQL
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Balance report built");
        Ok(rows
            .into_iter()
            .map(|row| ArticleBalance::from(ArticleFlows::from(row)))
            .collect())
    }

    /// Balance of one article.
    pub async fn for_article(&self, service_id: i64) -> DbResult<Option<ArticleBalance>> {
        let row = sqlx::query_as::<_, FlowRow>(&format!(
            "{} WHERE a.service_id = ?1 GROUP BY a.service_id",
            FLOWS_SQL
        ))
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ArticleBalance::from(ArticleFlows::from(row))))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
