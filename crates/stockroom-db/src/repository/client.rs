//! # Client Repository
//!
//! Customer cards. Clients are reference data for whoever fills in an
//! order's shipment block; nothing links to them by key.

use sqlx::SqlitePool;
use stockroom_core::validation::validate_client;
use stockroom_core::{Client, ClientInput};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

const CLIENT_COLUMNS: &str = "id, city, full_name, phone, passport_number, carrier, comment";

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn create(&self, input: &ClientInput) -> DbResult<Client> {
        validate_client(input)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO clients (city, full_name, phone, passport_number, carrier, comment)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id
            "#,
        )
        .bind(input.city.trim())
        .bind(input.full_name.trim())
        .bind(input.phone.trim())
        .bind(input.passport_number.trim())
        .bind(input.carrier.trim())
        .bind(&input.comment)
        .fetch_one(&self.pool)
        .await?;

        info!(id, "Client created");

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE id = ?1",
            CLIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    /// Lists clients, newest first.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients ORDER BY id DESC",
            CLIENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = clients.len(), "Listed clients");
        Ok(clients)
    }

    pub async fn update(&self, id: i64, input: &ClientInput) -> DbResult<Client> {
        validate_client(input)?;

        let result = sqlx::query(
            r#"
            UPDATE clients SET
                city = ?2,
                full_name = ?3,
                phone = ?4,
                passport_number = ?5,
                carrier = ?6,
                comment = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.city.trim())
        .bind(input.full_name.trim())
        .bind(input.phone.trim())
        .bind(input.passport_number.trim())
        .bind(input.carrier.trim())
        .bind(&input.comment)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        debug!(id, "Client updated");

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        info!(id, "Client deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
