//! Order repository.
//!
//! Orders are hard-deleted; their notes go with them through `ON DELETE CASCADE`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use rabit_core::models::{NewOrder, Note, Order, OrderCommit, OrderItem, ShippedAtChange};
use rabit_core::{BrandId, NoteId, OrderId, OrderStatus};

use super::{RepositoryError, parse_column};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    brand_id: i32,
    customer_name: String,
    customer_phone: String,
    destination: String,
    status: String,
    items: Json<Vec<OrderItem>>,
    shipping_company: Option<String>,
    driver: Option<String>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, notes: Vec<Note>) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: OrderId::new(self.id),
            brand_id: BrandId::new(self.brand_id),
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            destination: self.destination,
            status: parse_column::<OrderStatus>(&self.status, "order status")?,
            items: self.items.0,
            notes,
            shipping_company: self.shipping_company,
            driver: self.driver,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            shipped_at: self.shipped_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: i32,
    order_id: i32,
    content: String,
    resolved: bool,
    created_at: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Self {
            id: NoteId::new(row.id),
            content: row.content,
            created_at: row.created_at,
            resolved: row.resolved,
        }
    }
}

const ORDER_COLUMNS: &str = "id, brand_id, customer_name, customer_phone, destination, status, \
                             items, shipping_company, driver, version, created_at, updated_at, \
                             shipped_at";

const NOTE_COLUMNS: &str = "id, order_id, content, resolved, created_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a brand's orders, newest first, with their notes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a status is unknown.
    pub async fn list_for_brand(&self, brand: BrandId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM rabit.customer_order
            WHERE brand_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(brand.as_i32())
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let note_rows = sqlx::query_as::<_, NoteRow>(&format!(
            r"
            SELECT {NOTE_COLUMNS} FROM rabit.order_note
            WHERE order_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut notes: HashMap<i32, Vec<Note>> = HashMap::new();
        for row in note_rows {
            notes.entry(row.order_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let order_notes = notes.remove(&row.id).unwrap_or_default();
                row.into_order(order_notes)
            })
            .collect()
    }

    /// Insert an order with status `New`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, brand: BrandId, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO rabit.customer_order
                (brand_id, customer_name, customer_phone, destination, status, items)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(brand.as_i32())
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.destination)
        .bind(OrderStatus::New.as_str())
        .bind(Json(&order.items))
        .fetch_one(self.pool)
        .await?;

        row.into_order(Vec::new())
    }

    /// Apply a whole edit buffer in one transaction.
    ///
    /// The order row is only written if it is still at `expected_version`;
    /// staged notes are inserted and resolutions applied in the same
    /// transaction, so either everything lands or nothing does.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::VersionConflict` if the row moved on.
    /// Returns `RepositoryError::NotFound` if the order or a referenced note is gone.
    pub async fn commit(
        &self,
        brand: BrandId,
        id: OrderId,
        expected_version: i32,
        commit: &OrderCommit,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (touch_shipped_at, shipped_at) = match commit.update.shipped_at {
            ShippedAtChange::Keep => (false, None),
            ShippedAtChange::Set(at) => (true, Some(at)),
            ShippedAtChange::Clear => (true, None),
        };

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE rabit.customer_order
            SET status = $4,
                shipping_company = $5,
                driver = $6,
                shipped_at = CASE WHEN $7 THEN $8 ELSE shipped_at END,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND brand_id = $2 AND version = $3
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(brand.as_i32())
        .bind(expected_version)
        .bind(commit.update.status.as_str())
        .bind(&commit.update.shipping_company)
        .bind(&commit.update.driver)
        .bind(touch_shipped_at)
        .bind(shipped_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(self.stale_or_missing(brand, id).await);
        };

        for note in &commit.new_notes {
            sqlx::query("INSERT INTO rabit.order_note (order_id, content) VALUES ($1, $2)")
                .bind(id.as_i32())
                .bind(&note.content)
                .execute(&mut *tx)
                .await?;
        }

        for &(note, resolved) in &commit.note_resolutions {
            let result =
                sqlx::query("UPDATE rabit.order_note SET resolved = $3 WHERE id = $1 AND order_id = $2")
                    .bind(note.as_i32())
                    .bind(id.as_i32())
                    .bind(resolved)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(RepositoryError::NotFound);
            }
        }

        let notes = fetch_notes(&mut tx, id).await?;
        tx.commit().await?;

        row.into_order(notes)
    }

    /// Delete an order and its notes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such order.
    pub async fn delete(&self, brand: BrandId, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM rabit.customer_order WHERE id = $1 AND brand_id = $2")
            .bind(id.as_i32())
            .bind(brand.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn stale_or_missing(&self, brand: BrandId, id: OrderId) -> RepositoryError {
        let current = sqlx::query_scalar::<_, i32>(
            "SELECT version FROM rabit.customer_order WHERE id = $1 AND brand_id = $2",
        )
        .bind(id.as_i32())
        .bind(brand.as_i32())
        .fetch_optional(self.pool)
        .await;

        match current {
            Ok(Some(current)) => RepositoryError::VersionConflict { current },
            Ok(None) => RepositoryError::NotFound,
            Err(e) => RepositoryError::Database(e),
        }
    }
}

async fn fetch_notes(
    tx: &mut Transaction<'_, Postgres>,
    order: OrderId,
) -> Result<Vec<Note>, RepositoryError> {
    let rows = sqlx::query_as::<_, NoteRow>(&format!(
        "SELECT {NOTE_COLUMNS} FROM rabit.order_note WHERE order_id = $1 ORDER BY created_at ASC, id ASC"
    ))
    .bind(order.as_i32())
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}
