//! Product repository.
//!
//! Products are soft-deleted; listings and updates only see live rows.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use rabit_core::models::{Product, ProductFields};
use rabit_core::{BrandId, ProductId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    brand_id: i32,
    name: String,
    sku: String,
    image_url: String,
    quantity: i32,
    active: bool,
    deleted: bool,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            brand_id: BrandId::new(row.brand_id),
            name: row.name,
            sku: row.sku,
            image_url: row.image_url,
            quantity: row.quantity,
            active: row.active,
            deleted: row.deleted,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, brand_id, name, sku, image_url, quantity, active, deleted, \
                               version, created_at, updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a brand's live products by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_brand(&self, brand: BrandId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM rabit.product
            WHERE brand_id = $1 AND NOT deleted
            ORDER BY name ASC, id ASC
            "
        ))
        .bind(brand.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        brand: BrandId,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO rabit.product (brand_id, name, sku, image_url, quantity, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(brand.as_i32())
        .bind(&fields.name)
        .bind(&fields.sku)
        .bind(&fields.image_url)
        .bind(fields.quantity)
        .bind(fields.active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Overwrite a product's editable fields if it is still at `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::VersionConflict` if the row moved on.
    /// Returns `RepositoryError::NotFound` if the row is gone or deleted.
    pub async fn update(
        &self,
        brand: BrandId,
        id: ProductId,
        expected_version: i32,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE rabit.product
            SET name = $4, sku = $5, image_url = $6, quantity = $7, active = $8,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND brand_id = $2 AND version = $3 AND NOT deleted
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(brand.as_i32())
        .bind(expected_version)
        .bind(&fields.name)
        .bind(&fields.sku)
        .bind(&fields.image_url)
        .bind(fields.quantity)
        .bind(fields.active)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(self.stale_or_missing(brand, id).await),
        }
    }

    /// Soft-delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no live product.
    pub async fn soft_delete(&self, brand: BrandId, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE rabit.product
            SET deleted = TRUE, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND brand_id = $2 AND NOT deleted
            ",
        )
        .bind(id.as_i32())
        .bind(brand.as_i32())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn stale_or_missing(&self, brand: BrandId, id: ProductId) -> RepositoryError {
        let current = sqlx::query_scalar::<_, i32>(
            "SELECT version FROM rabit.product WHERE id = $1 AND brand_id = $2 AND NOT deleted",
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
