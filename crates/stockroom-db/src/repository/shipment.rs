//! # Shipping Journal
//!
//! Dispatch records and per-day notes. The journal is kept by hand next to
//! orders: a shipment row does not reference an order and never touches
//! stock or debt.
//!
//! `ship_date` is stored as entered; listing by date matches it exactly.

use sqlx::SqlitePool;
use stockroom_core::validation::{validate_shipment, validate_shipment_note};
use stockroom_core::{Shipment, ShipmentDetails, ShipmentNote, ShipmentNoteInput};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::payment;

#[derive(Debug, sqlx::FromRow)]
struct ShipmentRow {
    id: i64,
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

impl From<ShipmentRow> for Shipment {
    fn from(row: ShipmentRow) -> Self {
        Shipment {
            id: row.id,
            details: ShipmentDetails {
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
        }
    }
}

const SHIPMENT_COLUMNS: &str =
    "id, ship_date, city, full_name, phone, passport_inn, carrier, places, price, weight";

const NOTE_COLUMNS: &str = "id, ship_date, note, created_at";

/// Blank filters list everything.
fn date_filter(date: Option<&str>) -> Option<&str> {
    date.map(str::trim).filter(|d| !d.is_empty())
}

/// Repository for shipments and shipment notes.
#[derive(Debug, Clone)]
pub struct ShipmentRepository {
    pool: SqlitePool,
}

impl ShipmentRepository {
    /// Creates a new ShipmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShipmentRepository { pool }
    }

    // =========================================================================
    // Shipments
    // =========================================================================

    pub async fn create(&self, input: &ShipmentDetails) -> DbResult<Shipment> {
        validate_shipment(input)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO shipments
                (ship_date, city, full_name, phone, passport_inn, carrier, places, price, weight)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING id
            "#,
        )
        .bind(input.ship_date.trim())
        .bind(&input.city)
        .bind(input.full_name.trim())
        .bind(&input.phone)
        .bind(&input.passport_inn)
        .bind(&input.carrier)
        .bind(input.places)
        .bind(input.price)
        .bind(input.weight)
        .fetch_one(&self.pool)
        .await?;

        info!(id, ship_date = %input.ship_date.trim(), "Shipment recorded");

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Shipment", id))
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Shipment>> {
        let row = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {} FROM shipments WHERE id = ?1",
            SHIPMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Shipment::from))
    }

    /// Lists shipments, latest date first, optionally for one date.
    pub async fn list(&self, date: Option<&str>) -> DbResult<Vec<Shipment>> {
        let rows = match date_filter(date) {
            Some(date) => {
                sqlx::query_as::<_, ShipmentRow>(&format!(
                    "SELECT {} FROM shipments WHERE ship_date = ?1 ORDER BY ship_date DESC, id DESC",
                    SHIPMENT_COLUMNS
                ))
                .bind(date)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ShipmentRow>(&format!(
                    "SELECT {} FROM shipments ORDER BY ship_date DESC, id DESC",
                    SHIPMENT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        debug!(count = rows.len(), "Listed shipments");
        Ok(rows.into_iter().map(Shipment::from).collect())
    }

    pub async fn update(&self, id: i64, input: &ShipmentDetails) -> DbResult<Shipment> {
        validate_shipment(input)?;

        let result = sqlx::query(
            r#"
            UPDATE shipments SET
                ship_date = ?2,
                city = ?3,
                full_name = ?4,
                phone = ?5,
                passport_inn = ?6,
                carrier = ?7,
                places = ?8,
                price = ?9,
                weight = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.ship_date.trim())
        .bind(&input.city)
        .bind(input.full_name.trim())
        .bind(&input.phone)
        .bind(&input.passport_inn)
        .bind(&input.carrier)
        .bind(input.places)
        .bind(input.price)
        .bind(input.weight)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shipment", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Shipment", id))
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM shipments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shipment", id));
        }

        info!(id, "Shipment deleted");
        Ok(())
    }

    // =========================================================================
    // Notes
    // =========================================================================

    /// Adds a note to a shipping day, stamped with the server time.
    pub async fn add_note(&self, input: &ShipmentNoteInput) -> DbResult<ShipmentNote> {
        validate_shipment_note(input)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO shipment_notes (ship_date, note, created_at)
            VALUES (?1, ?2, ?3)
            RETURNING id
            "#,
        )
        .bind(input.ship_date.trim())
        .bind(input.note.trim())
        .bind(payment::now())
        .fetch_one(&self.pool)
        .await?;

        debug!(id, "Shipment note added");

        self.get_note(id)
            .await?
            .ok_or_else(|| DbError::not_found("Shipment note", id))
    }

    pub async fn get_note(&self, id: i64) -> DbResult<Option<ShipmentNote>> {
        let note = sqlx::query_as::<_, ShipmentNote>(&format!(
            "SELECT {} FROM shipment_notes WHERE id = ?1",
            NOTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(note)
    }

    /// Lists notes, latest date first, optionally for one date.
    pub async fn list_notes(&self, date: Option<&str>) -> DbResult<Vec<ShipmentNote>> {
        let notes = match date_filter(date) {
            Some(date) => {
                sqlx::query_as::<_, ShipmentNote>(&format!(
                    "SELECT {} FROM shipment_notes WHERE ship_date = ?1 ORDER BY ship_date DESC, id DESC",
                    NOTE_COLUMNS
                ))
                .bind(date)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ShipmentNote>(&format!(
                    "SELECT {} FROM shipment_notes ORDER BY ship_date DESC, id DESC",
                    NOTE_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(notes)
    }

    /// Rewrites the date and text of a note; `created_at` is kept.
    pub async fn update_note(&self, id: i64, input: &ShipmentNoteInput) -> DbResult<ShipmentNote> {
        validate_shipment_note(input)?;

        let result = sqlx::query("UPDATE shipment_notes SET ship_date = ?2, note = ?3 WHERE id = ?1")
            .bind(id)
            .bind(input.ship_date.trim())
            .bind(input.note.trim())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shipment note", id));
        }

        self.get_note(id)
            .await?
            .ok_or_else(|| DbError::not_found("Shipment note", id))
    }

    pub async fn delete_note(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM shipment_notes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shipment note", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use stockroom_core::ErrorKind;

    fn shipment(ship_date: &str, full_name: &str) -> ShipmentDetails {
        ShipmentDetails {
            ship_date: ship_date.to_string(),
            city: "Omsk".to_string(),
            full_name: full_name.to_string(),
            carrier: "PEK".to_string(),
            places: 3,
            price: 1250.5,
            weight: 61.2,
            ..Default::default()
        }
    }

    fn note(ship_date: &str, text: &str) -> ShipmentNoteInput {
        ShipmentNoteInput {
            ship_date: ship_date.to_string(),
            note: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_shipment() {
        let db = test_db().await;
        let created = db
            .shipments()
            .create(&shipment(" 2024-03-01 ", "Sidorov"))
            .await
            .unwrap();

        assert_eq!(created.details.ship_date, "2024-03-01");
        assert_eq!(created.details.places, 3);
        assert_eq!(created.details.weight, 61.2);
        assert_eq!(db.shipments().get(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_shipment_requires_date_and_name() {
        let db = test_db().await;
        let shipments = db.shipments();

        let err = shipments.create(&shipment("", "Sidorov")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = shipments.create(&shipment("2024-03-01", "")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(shipments.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_shipments_by_date() {
        let db = test_db().await;
        let shipments = db.shipments();
        let early = shipments.create(&shipment("2024-03-01", "A")).await.unwrap();
        let late = shipments.create(&shipment("2024-03-02", "B")).await.unwrap();
        let late_too = shipments.create(&shipment("2024-03-02", "C")).await.unwrap();

        let all: Vec<i64> = shipments.list(None).await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(all, vec![late_too.id, late.id, early.id]);

        let day: Vec<i64> = shipments
            .list(Some("2024-03-01"))
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(day, vec![early.id]);

        assert_eq!(shipments.list(Some("  ")).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete_shipment() {
        let db = test_db().await;
        let shipments = db.shipments();
        let created = shipments.create(&shipment("2024-03-01", "A")).await.unwrap();

        let mut changed = shipment("2024-03-05", "A");
        changed.places = 7;
        let updated = shipments.update(created.id, &changed).await.unwrap();
        assert_eq!(updated.details.ship_date, "2024-03-05");
        assert_eq!(updated.details.places, 7);

        let mut negative = changed.clone();
        negative.weight = -1.0;
        let err = shipments.update(created.id, &negative).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        shipments.delete(created.id).await.unwrap();
        assert_eq!(shipments.delete(created.id).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            shipments.update(created.id, &changed).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_notes_lifecycle() {
        let db = test_db().await;
        let shipments = db.shipments();

        let first = shipments.add_note(&note("2024-03-01", "call carrier")).await.unwrap();
        let second = shipments.add_note(&note("2024-03-02", "two boxes")).await.unwrap();
        assert_eq!(first.note, "call carrier");

        let all: Vec<i64> = shipments.list_notes(None).await.unwrap().iter().map(|n| n.id).collect();
        assert_eq!(all, vec![second.id, first.id]);
        assert_eq!(shipments.list_notes(Some("2024-03-02")).await.unwrap(), vec![second.clone()]);

        let updated = shipments
            .update_note(first.id, &note("2024-03-03", "carrier confirmed"))
            .await
            .unwrap();
        assert_eq!(updated.ship_date, "2024-03-03");
        assert_eq!(updated.created_at, first.created_at);

        let err = shipments.add_note(&note("2024-03-01", " ")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        shipments.delete_note(first.id).await.unwrap();
        assert_eq!(shipments.get_note(first.id).await.unwrap(), None);
        assert_eq!(
            shipments.delete_note(first.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
