//! Document store behind the API.
//!
//! [`DocumentStore`] is the persistence seam: [`PgDocumentStore`] talks to
//! `PostgreSQL` through the repositories in [`crate::db`], and
//! [`MemoryDocumentStore`] keeps everything in process for local runs and
//! tests. [`Store`] wraps either one and publishes a change notification on
//! the [`SnapshotHub`] after every successful write.

mod hub;
mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use rabit_core::models::{
    Brand, NewBrand, NewOrder, NewUser, Order, OrderCommit, Product, ProductFields, User,
};
use rabit_core::{BrandId, Email, OrderId, ProductId, UserId};

use crate::db::RepositoryError;

pub use hub::{Collection, SnapshotHub};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Persistence operations used by the API.
///
/// Listings never include soft-deleted brands or products. Versioned writes
/// fail with [`RepositoryError::VersionConflict`] when the stored row is no
/// longer at `expected_version`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // Users

    async fn user_by_email(&self, email: &Email)
    -> Result<Option<(User, String)>, RepositoryError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError>;

    // Brands

    /// Live brands, newest first.
    async fn list_brands(&self) -> Result<Vec<Brand>, RepositoryError>;

    async fn brand_by_id(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError>;

    async fn brand_by_owner(&self, owner: UserId) -> Result<Option<Brand>, RepositoryError>;

    async fn create_brand(&self, brand: &NewBrand) -> Result<Brand, RepositoryError>;

    // Products

    /// Live products of a brand, by name.
    async fn list_products(&self, brand: BrandId) -> Result<Vec<Product>, RepositoryError>;

    async fn create_product(
        &self,
        brand: BrandId,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError>;

    async fn update_product(
        &self,
        brand: BrandId,
        id: ProductId,
        expected_version: i32,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError>;

    /// Soft delete.
    async fn delete_product(&self, brand: BrandId, id: ProductId) -> Result<(), RepositoryError>;

    // Orders

    /// Orders of a brand with their notes, newest first.
    async fn list_orders(&self, brand: BrandId) -> Result<Vec<Order>, RepositoryError>;

    async fn create_order(&self, brand: BrandId, order: &NewOrder)
    -> Result<Order, RepositoryError>;

    /// Apply an order save atomically.
    async fn commit_order(
        &self,
        brand: BrandId,
        id: OrderId,
        expected_version: i32,
        commit: &OrderCommit,
    ) -> Result<Order, RepositoryError>;

    /// Hard delete, notes included.
    async fn delete_order(&self, brand: BrandId, id: OrderId) -> Result<(), RepositoryError>;
}

/// Shared handle to the configured backend plus its change notifications.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn DocumentStore>,
    hub: SnapshotHub,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self {
            backend,
            hub: SnapshotHub::new(),
        }
    }

    /// A store backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::new(Arc::new(PgDocumentStore::new(pool)))
    }

    /// An empty in-process store.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryDocumentStore::new()))
    }

    #[must_use]
    pub const fn hub(&self) -> &SnapshotHub {
        &self.hub
    }

    /// # Errors
    ///
    /// Returns the backend's error when it is unreachable.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.backend.ping().await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        self.backend.user_by_email(email).await
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.backend.user_by_id(id).await
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn list_brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        self.backend.list_brands().await
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn brand_by_id(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        self.backend.brand_by_id(id).await
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn brand_by_owner(&self, owner: UserId) -> Result<Option<Brand>, RepositoryError> {
        self.backend.brand_by_owner(owner).await
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn list_products(&self, brand: BrandId) -> Result<Vec<Product>, RepositoryError> {
        self.backend.list_products(brand).await
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn list_orders(&self, brand: BrandId) -> Result<Vec<Order>, RepositoryError> {
        self.backend.list_orders(brand).await
    }

    // =========================================================================
    // Writes (publish on success)
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate email.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        self.backend.create_user(user).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the owner already has a brand.
    pub async fn create_brand(&self, brand: &NewBrand) -> Result<Brand, RepositoryError> {
        let created = self.backend.create_brand(brand).await?;
        self.hub.publish(Collection::Brands);
        Ok(created)
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn create_product(
        &self,
        brand: BrandId,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        let created = self.backend.create_product(brand, fields).await?;
        self.hub.publish(Collection::Products(brand));
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::VersionConflict` or `RepositoryError::NotFound`.
    pub async fn update_product(
        &self,
        brand: BrandId,
        id: ProductId,
        expected_version: i32,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        let saved = self
            .backend
            .update_product(brand, id, expected_version, fields)
            .await?;
        self.hub.publish(Collection::Products(brand));
        Ok(saved)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no live product.
    pub async fn delete_product(&self, brand: BrandId, id: ProductId) -> Result<(), RepositoryError> {
        self.backend.delete_product(brand, id).await?;
        self.hub.publish(Collection::Products(brand));
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn create_order(
        &self,
        brand: BrandId,
        order: &NewOrder,
    ) -> Result<Order, RepositoryError> {
        let created = self.backend.create_order(brand, order).await?;
        self.hub.publish(Collection::Orders(brand));
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::VersionConflict` or `RepositoryError::NotFound`.
    pub async fn commit_order(
        &self,
        brand: BrandId,
        id: OrderId,
        expected_version: i32,
        commit: &OrderCommit,
    ) -> Result<Order, RepositoryError> {
        let saved = self
            .backend
            .commit_order(brand, id, expected_version, commit)
            .await?;
        self.hub.publish(Collection::Orders(brand));
        Ok(saved)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such order.
    pub async fn delete_order(&self, brand: BrandId, id: OrderId) -> Result<(), RepositoryError> {
        self.backend.delete_order(brand, id).await?;
        self.hub.publish(Collection::Orders(brand));
        Ok(())
    }
}
