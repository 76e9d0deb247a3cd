//! `PostgreSQL` backend.

use async_trait::async_trait;
use sqlx::PgPool;

use rabit_core::models::{
    Brand, NewBrand, NewOrder, NewUser, Order, OrderCommit, Product, ProductFields, User,
};
use rabit_core::{BrandId, Email, OrderId, ProductId, UserId};

use super::DocumentStore;
use crate::db::{
    BrandRepository, OrderRepository, ProductRepository, RepositoryError, UserRepository,
};

/// [`DocumentStore`] over the repositories in [`crate::db`].
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        UserRepository::new(&self.pool)
            .get_with_hash_by_email(email)
            .await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_id(id).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool).create(user).await
    }

    async fn list_brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        BrandRepository::new(&self.pool).list().await
    }

    async fn brand_by_id(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        BrandRepository::new(&self.pool).get_by_id(id).await
    }

    async fn brand_by_owner(&self, owner: UserId) -> Result<Option<Brand>, RepositoryError> {
        BrandRepository::new(&self.pool).get_by_owner(owner).await
    }

    async fn create_brand(&self, brand: &NewBrand) -> Result<Brand, RepositoryError> {
        BrandRepository::new(&self.pool).create(brand).await
    }

    async fn list_products(&self, brand: BrandId) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).list_for_brand(brand).await
    }

    async fn create_product(
        &self,
        brand: BrandId,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        ProductRepository::new(&self.pool).create(brand, fields).await
    }

    async fn update_product(
        &self,
        brand: BrandId,
        id: ProductId,
        expected_version: i32,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        ProductRepository::new(&self.pool)
            .update(brand, id, expected_version, fields)
            .await
    }

    async fn delete_product(&self, brand: BrandId, id: ProductId) -> Result<(), RepositoryError> {
        ProductRepository::new(&self.pool).soft_delete(brand, id).await
    }

    async fn list_orders(&self, brand: BrandId) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list_for_brand(brand).await
    }

    async fn create_order(
        &self,
        brand: BrandId,
        order: &NewOrder,
    ) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool).create(brand, order).await
    }

    async fn commit_order(
        &self,
        brand: BrandId,
        id: OrderId,
        expected_version: i32,
        commit: &OrderCommit,
    ) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool)
            .commit(brand, id, expected_version, commit)
            .await
    }

    async fn delete_order(&self, brand: BrandId, id: OrderId) -> Result<(), RepositoryError> {
        OrderRepository::new(&self.pool).delete(brand, id).await
    }
}
