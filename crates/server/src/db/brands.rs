//! Brand repository.
//!
//! Deleted brands are never returned by list or lookup queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use rabit_core::models::{Brand, NewBrand};
use rabit_core::{BrandId, UserId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct BrandRow {
    id: i32,
    name: String,
    logo: String,
    phone: String,
    owner_id: i32,
    active: bool,
    deleted: bool,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BrandRow> for Brand {
    fn from(row: BrandRow) -> Self {
        Self {
            id: BrandId::new(row.id),
            name: row.name,
            logo: row.logo,
            phone: row.phone,
            owner: UserId::new(row.owner_id),
            active: row.active,
            deleted: row.deleted,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const BRAND_COLUMNS: &str =
    "id, name, logo, phone, owner_id, active, deleted, version, created_at, updated_at";

/// Repository for brand database operations.
pub struct BrandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BrandRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List live brands, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Brand>, RepositoryError> {
        let rows = sqlx::query_as::<_, BrandRow>(&format!(
            "SELECT {BRAND_COLUMNS} FROM rabit.brand WHERE NOT deleted ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a live brand by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        let row = sqlx::query_as::<_, BrandRow>(&format!(
            "SELECT {BRAND_COLUMNS} FROM rabit.brand WHERE id = $1 AND NOT deleted"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get the live brand owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_owner(&self, owner: UserId) -> Result<Option<Brand>, RepositoryError> {
        let row = sqlx::query_as::<_, BrandRow>(&format!(
            "SELECT {BRAND_COLUMNS} FROM rabit.brand WHERE owner_id = $1 AND NOT deleted"
        ))
        .bind(owner.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a brand.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the owner already has a brand.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, brand: &NewBrand) -> Result<Brand, RepositoryError> {
        let row = sqlx::query_as::<_, BrandRow>(&format!(
            r"
            INSERT INTO rabit.brand (name, logo, phone, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {BRAND_COLUMNS}
            "
        ))
        .bind(&brand.name)
        .bind(&brand.logo)
        .bind(&brand.phone)
        .bind(brand.owner.as_i32())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "owner already has a brand"))?;

        Ok(row.into())
    }
}
