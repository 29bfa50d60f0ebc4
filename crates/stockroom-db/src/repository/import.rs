//! # Article Import
//!
//! Bulk loads articles from a comma-separated export, one article per
//! record:
//!
//! ```text
//! id, no, code, description, euro, colli, kg, value
//! 100,12,WL-1,"Wool, grey","4,50",2,"1 250,5",5629
//! ```
//!
//! Numbers go through the numeric normalizer. A record is skipped when it
//! has fewer than 8 fields, a blank or non-positive id, or a malformed
//! euro / colli / kg / value; blank numbers read as zero. Header lines
//! therefore skip themselves.
//!
//! The whole file is inserted in one transaction and bypasses the ledger:
//! `kg` becomes both the stock and the income of the new row.

use serde::Serialize;
use sqlx::SqlitePool;
use stockroom_core::numeric::{normalize, round_weight, try_parse_number};
use tracing::{info, warn};

use crate::error::DbResult;
use crate::repository::begin_write;

/// Outcome of one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// One parsed import record.
#[derive(Debug, Clone, PartialEq)]
struct ImportRow {
    id: i64,
    no: String,
    code: String,
    description: String,
    euro: f64,
    colli: f64,
    kg: f64,
    value: f64,
}

// =============================================================================
// Parsing
// =============================================================================

/// Splits CSV text into records of fields.
///
/// Quoted fields may contain commas, newlines and doubled quotes (`""`).
/// A quote in the middle of an unquoted field is kept as a literal.
fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

/// Nothing numeric reads as zero; anything else must parse.
fn import_number(raw: &str) -> Option<f64> {
    if normalize(raw).is_empty() {
        return Some(0.0);
    }
    try_parse_number(raw)
}

fn parse_row(fields: &[String], line: usize) -> Option<ImportRow> {
    if fields.len() < 8 {
        return None;
    }

    let id = try_parse_number(&fields[0]).map(|v| v.trunc() as i64)?;
    if id <= 0 {
        warn!(line, "Skipping import row with non-positive id");
        return None;
    }

    let mut numbers = [0.0_f64; 4];
    for (slot, (index, name)) in numbers
        .iter_mut()
        .zip([(4, "euro"), (5, "colli"), (6, "kg"), (7, "value")])
    {
        match import_number(&fields[index]) {
            Some(v) => *slot = v,
            None => {
                warn!(line, id, field = name, "Skipping import row with malformed number");
                return None;
            }
        }
    }
    let [euro, colli, kg, value] = numbers;

    Some(ImportRow {
        id,
        no: fields[1].trim().to_string(),
        code: fields[2].trim().to_string(),
        description: fields[3].trim().to_string(),
        euro,
        colli,
        kg: round_weight(kg),
        value,
    })
}

// =============================================================================
// Importer
// =============================================================================

/// Bulk article loader.
#[derive(Debug, Clone)]
pub struct ArticleImporter {
    pool: SqlitePool,
}

impl ArticleImporter {
    /// Creates a new ArticleImporter.
    pub fn new(pool: SqlitePool) -> Self {
        ArticleImporter { pool }
    }

    /// Imports every well-formed record of `text`.
    ///
    /// With `truncate`, existing articles are deleted first, inside the same
    /// transaction. That fails (and the import is abandoned) while any
    /// product allocation still references an article.
    pub async fn import_csv(&self, text: &str, truncate: bool) -> DbResult<ImportReport> {
        let mut tx = begin_write(&self.pool).await?;

        if truncate {
            let removed = sqlx::query("DELETE FROM articles").execute(&mut *tx).await?;
            sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'articles'")
                .execute(&mut *tx)
                .await?;
            info!(removed = removed.rows_affected(), "Articles truncated");
        }

        let mut report = ImportReport::default();
        for (index, fields) in split_records(text).iter().enumerate() {
            let Some(row) = parse_row(fields, index + 1) else {
                report.skipped += 1;
                continue;
            };

            sqlx::query(
                r#"
                INSERT INTO articles (id, no, code, description, euro, colli, kg, income_kg, value)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)
                "#,
            )
            .bind(row.id)
            .bind(&row.no)
            .bind(&row.code)
            .bind(&row.description)
            .bind(row.euro)
            .bind(row.colli)
            .bind(row.kg)
            .bind(row.value)
            .execute(&mut *tx)
            .await?;

            report.inserted += 1;
        }

        tx.commit().await?;

        info!(inserted = report.inserted, skipped = report.skipped, "Article import complete");
        Ok(report)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
