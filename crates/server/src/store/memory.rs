//! In-process backend for `RABIT_STORE=memory` and tests.
//!
//! Mirrors the `PostgreSQL` semantics: unique emails, one live brand per
//! owner, version-checked writes, soft-deleted products and brands, and
//! atomic order commits.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use rabit_core::models::{
    Brand, NewBrand, NewOrder, NewUser, Note, Order, OrderCommit, Product, ProductFields, User,
};
use rabit_core::{BrandId, Email, NoteId, OrderId, OrderStatus, ProductId, UserId};

use super::DocumentStore;
use crate::db::RepositoryError;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<(User, String)>,
    brands: Vec<Brand>,
    products: Vec<Product>,
    orders: Vec<Order>,
    last_id: i32,
}

impl Tables {
    /// One sequence shared by every table is enough here.
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn live_product_mut(&mut self, brand: BrandId, id: ProductId) -> Option<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| p.id == id && p.brand_id == brand && !p.deleted)
    }
}

/// [`super::DocumentStore`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    tables: RwLock<Tables>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|(user, _)| &user.email == email)
            .cloned())
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone()))
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let created = User {
            id: UserId::new(tables.next_id()),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            disabled: false,
            created_at: Utc::now(),
        };
        tables
            .users
            .push((created.clone(), user.password_hash.clone()));
        Ok(created)
    }

    async fn list_brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut brands: Vec<Brand> = tables.brands.iter().filter(|b| !b.deleted).cloned().collect();
        brands.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(brands)
    }

    async fn brand_by_id(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .brands
            .iter()
            .find(|b| b.id == id && !b.deleted)
            .cloned())
    }

    async fn brand_by_owner(&self, owner: UserId) -> Result<Option<Brand>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .brands
            .iter()
            .find(|b| b.owner == owner && !b.deleted)
            .cloned())
    }

    async fn create_brand(&self, brand: &NewBrand) -> Result<Brand, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .brands
            .iter()
            .any(|b| b.owner == brand.owner && !b.deleted)
        {
            return Err(RepositoryError::Conflict(
                "owner already has a brand".to_owned(),
            ));
        }
        let now = Utc::now();
        let created = Brand {
            id: BrandId::new(tables.next_id()),
            name: brand.name.clone(),
            logo: brand.logo.clone(),
            phone: brand.phone.clone(),
            owner: brand.owner,
            active: true,
            deleted: false,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tables.brands.push(created.clone());
        Ok(created)
    }

    async fn list_products(&self, brand: BrandId) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| p.brand_id == brand && !p.deleted)
            .cloned()
            .collect();
        products.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(products)
    }

    async fn create_product(
        &self,
        brand: BrandId,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(tables.next_id()),
            brand_id: brand,
            name: fields.name.clone(),
            sku: fields.sku.clone(),
            image_url: fields.image_url.clone(),
            quantity: fields.quantity,
            active: fields.active,
            deleted: false,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tables.products.push(created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        brand: BrandId,
        id: ProductId,
        expected_version: i32,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let product = tables
            .live_product_mut(brand, id)
            .ok_or(RepositoryError::NotFound)?;
        if product.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                current: product.version,
            });
        }
        product.name.clone_from(&fields.name);
        product.sku.clone_from(&fields.sku);
        product.image_url.clone_from(&fields.image_url);
        product.quantity = fields.quantity;
        product.active = fields.active;
        product.version += 1;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, brand: BrandId, id: ProductId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let product = tables
            .live_product_mut(brand, id)
            .ok_or(RepositoryError::NotFound)?;
        product.deleted = true;
        product.version += 1;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn list_orders(&self, brand: BrandId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| o.brand_id == brand)
            .cloned()
            .collect();
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(orders)
    }

    async fn create_order(
        &self,
        brand: BrandId,
        order: &NewOrder,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let created = Order {
            id: OrderId::new(tables.next_id()),
            brand_id: brand,
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            destination: order.destination.clone(),
            status: OrderStatus::New,
            items: order.items.clone(),
            notes: Vec::new(),
            shipping_company: None,
            driver: None,
            version: 1,
            created_at: now,
            updated_at: now,
            shipped_at: None,
        };
        tables.orders.push(created.clone());
        Ok(created)
    }

    async fn commit_order(
        &self,
        brand: BrandId,
        id: OrderId,
        expected_version: i32,
        commit: &OrderCommit,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let note_ids: Vec<NoteId> = commit
            .new_notes
            .iter()
            .map(|_| NoteId::new(tables.next_id()))
            .collect();

        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.brand_id == brand)
            .ok_or(RepositoryError::NotFound)?;
        if order.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                current: order.version,
            });
        }
        // Check everything before touching the row so a failure writes nothing.
        let known = |note: NoteId| order.notes.iter().any(|n| n.id == note);
        if !commit.note_resolutions.iter().all(|&(note, _)| known(note)) {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();
        commit.update.apply_to(order);
        for &(note, resolved) in &commit.note_resolutions {
            if let Some(existing) = order.notes.iter_mut().find(|n| n.id == note) {
                existing.resolved = resolved;
            }
        }
        for (new_note, note_id) in commit.new_notes.iter().zip(note_ids) {
            order.notes.push(Note {
                id: note_id,
                content: new_note.content.clone(),
                created_at: now,
                resolved: false,
            });
        }
        order.version += 1;
        order.updated_at = now;
        Ok(order.clone())
    }

    async fn delete_order(&self, brand: BrandId, id: OrderId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.orders.len();
        tables.orders.retain(|o| !(o.id == id && o.brand_id == brand));
        if tables.orders.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rabit_core::models::{NewNote, OrderItem, OrderUpdate, ProductSnapshot, ShippedAtChange};
    use rabit_core::UserRole;

    use super::*;

    async fn seeded() -> (MemoryDocumentStore, Brand) {
        let store = MemoryDocumentStore::new();
        let owner = store
            .create_user(&NewUser {
                email: Email::parse("owner@example.com").unwrap(),
                name: "Owner".into(),
                role: UserRole::Owner,
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let brand = store
            .create_brand(&NewBrand {
                name: "Acme".into(),
                logo: "https://placehold.co/100x100.png?text=A".into(),
                phone: "0123456789".into(),
                owner: owner.id,
            })
            .await
            .unwrap();
        (store, brand)
    }

    fn fields(name: &str) -> ProductFields {
        ProductFields {
            name: name.into(),
            sku: "SKU-1".into(),
            quantity: 3,
            image_url: "https://placehold.co/80x80.png".into(),
            active: true,
        }
    }

    fn new_order() -> NewOrder {
        NewOrder {
            customer_name: "Dana".into(),
            customer_phone: "0123456789".into(),
            destination: "12 Harbour Road".into(),
            items: vec![OrderItem {
                product: ProductSnapshot {
                    id: ProductId::new(99),
                    name: "Shirt".into(),
                    sku: "SH-1".into(),
                    image_url: "https://placehold.co/80x80.png".into(),
                },
                quantity: 1,
            }],
        }
    }

    fn commit(status: OrderStatus) -> OrderCommit {
        OrderCommit {
            update: OrderUpdate {
                status,
                shipping_company: None,
                driver: None,
                shipped_at: ShippedAtChange::Keep,
            },
            new_notes: Vec::new(),
            note_resolutions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (store, _) = seeded().await;
        let err = store
            .create_user(&NewUser {
                email: Email::parse("OWNER@example.com").unwrap(),
                name: "Again".into(),
                role: UserRole::Owner,
                password_hash: "hash".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_one_brand_per_owner() {
        let (store, brand) = seeded().await;
        let err = store
            .create_brand(&NewBrand {
                name: "Second".into(),
                logo: String::new(),
                phone: "0123456789".into(),
                owner: brand.owner,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_deleted_products_are_hidden_and_frozen() {
        let (store, brand) = seeded().await;
        let kept = store.create_product(brand.id, &fields("Boots")).await.unwrap();
        let gone = store.create_product(brand.id, &fields("Anorak")).await.unwrap();

        store.delete_product(brand.id, gone.id).await.unwrap();

        let listed = store.list_products(brand.id).await.unwrap();
        assert_eq!(listed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![kept.id]);
        let err = store
            .update_product(brand.id, gone.id, gone.version + 1, &fields("Anorak"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        assert!(matches!(
            store.delete_product(brand.id, gone.id).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_stale_product_update_reports_current_version() {
        let (store, brand) = seeded().await;
        let product = store.create_product(brand.id, &fields("Boots")).await.unwrap();
        store
            .update_product(brand.id, product.id, 1, &fields("Boots v2"))
            .await
            .unwrap();

        let err = store
            .update_product(brand.id, product.id, 1, &fields("Boots v3"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::VersionConflict { current: 2 }));
    }

    #[tokio::test]
    async fn test_order_commit_writes_notes_with_update() {
        let (store, brand) = seeded().await;
        let order = store.create_order(brand.id, &new_order()).await.unwrap();

        let mut first = commit(OrderStatus::Prepared);
        first.new_notes.push(NewNote {
            content: "Fragile".into(),
        });
        let saved = store
            .commit_order(brand.id, order.id, 1, &first)
            .await
            .unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(saved.status, OrderStatus::Prepared);
        assert_eq!(saved.notes.len(), 1);

        let mut second = commit(OrderStatus::Prepared);
        second.note_resolutions.push((saved.notes[0].id, true));
        let saved = store
            .commit_order(brand.id, order.id, 2, &second)
            .await
            .unwrap();
        assert!(saved.notes[0].resolved);
    }

    #[tokio::test]
    async fn test_order_commit_is_all_or_nothing() {
        let (store, brand) = seeded().await;
        let order = store.create_order(brand.id, &new_order()).await.unwrap();

        let mut bad = commit(OrderStatus::Issue);
        bad.note_resolutions.push((NoteId::new(12345), true));
        let err = store
            .commit_order(brand.id, order.id, 1, &bad)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));

        let listed = store.list_orders(brand.id).await.unwrap();
        assert_eq!(listed[0].status, OrderStatus::New);
        assert_eq!(listed[0].version, 1);
    }

    #[tokio::test]
    async fn test_order_delete_is_hard() {
        let (store, brand) = seeded().await;
        let order = store.create_order(brand.id, &new_order()).await.unwrap();
        store.delete_order(brand.id, order.id).await.unwrap();
        assert!(store.list_orders(brand.id).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_order(brand.id, order.id).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_other_brand_cannot_touch_order() {
        let (store, brand) = seeded().await;
        let order = store.create_order(brand.id, &new_order()).await.unwrap();
        let other = BrandId::new(brand.id.as_i32() + 100);
        let err = store
            .commit_order(other, order.id, 1, &commit(OrderStatus::Issue))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
