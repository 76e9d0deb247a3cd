//! Per-user list workspaces.
//!
//! Each (user, brand) pair gets a [`BrandWorkspace`] holding the order and
//! product table controllers. Workspaces live in a `moka` cache and expire
//! after an idle period; a mutex serializes operations on one workspace,
//! including the awaited store write of a save.
//!
//! Before every operation the workspace compares the store's revision for
//! the list with the one it last loaded and pulls a fresh snapshot when they
//! differ, so edits are reconciled row by row against other users' writes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

use rabit_core::models::{Order, Product};
use rabit_core::view::{
    Editable, Faceted, Filter, PendingSave, RowView, SaveFailure, TableState,
};
use rabit_core::{BrandId, OrderStatus, UserId};

use crate::db::RepositoryError;
use crate::store::{Collection, Store};

use super::ServiceError;

/// Maximum number of workspaces kept at once.
const MAX_WORKSPACES: u64 = 10_000;

/// Logouts buffered per listener before it lags.
const CLOSED_CAPACITY: usize = 64;

/// Shared handle to one workspace.
pub type SharedWorkspace = Arc<Mutex<BrandWorkspace>>;

/// Idle-expiring workspaces keyed by user and brand.
#[derive(Clone)]
pub struct WorkspaceRegistry {
    cache: Cache<(UserId, BrandId), SharedWorkspace>,
    closed: broadcast::Sender<UserId>,
}

impl WorkspaceRegistry {
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_WORKSPACES)
            .time_to_idle(idle)
            .build();
        let (closed, _) = broadcast::channel(CLOSED_CAPACITY);
        Self { cache, closed }
    }

    /// The user's workspace for `brand`, created empty on first use.
    pub async fn open(&self, user: UserId, brand: BrandId) -> SharedWorkspace {
        self.cache
            .get_with((user, brand), async move {
                tracing::debug!(%user, %brand, "Opening workspace");
                Arc::new(Mutex::new(BrandWorkspace::new(brand)))
            })
            .await
    }

    /// Drop every workspace the user has open and tell listeners from
    /// [`Self::closed`] that the user is gone.
    pub async fn close_all(&self, user: UserId) {
        let keys: Vec<_> = self
            .cache
            .iter()
            .filter(|(key, _)| key.0 == user)
            .map(|(key, _)| *key)
            .collect();
        for key in keys {
            self.cache.invalidate(&key).await;
        }
        // No receivers just means no open event streams.
        let _ = self.closed.send(user);
    }

    /// Users whose workspaces were closed from now on.
    ///
    /// A lagged receiver cannot tell whose logout it missed; treat that as
    /// closed too.
    #[must_use]
    pub fn closed(&self) -> broadcast::Receiver<UserId> {
        self.closed.subscribe()
    }
}

/// A table controller plus the store revision it was last synced to.
#[derive(Debug)]
pub struct Slot<E: Editable + Faceted> {
    table: TableState<E>,
    seen: Option<u64>,
}

impl<E: Editable + Faceted> Slot<E> {
    fn new(filter: Filter<E::Facet>) -> Self {
        Self {
            table: TableState::new(filter),
            seen: None,
        }
    }
}

/// One user's view of one brand.
#[derive(Debug)]
pub struct BrandWorkspace {
    brand: BrandId,
    orders: Slot<Order>,
    products: Slot<Product>,
}

/// A list the workspace keeps, and how it reaches the store.
#[async_trait]
pub trait Listing: Editable + Faceted + Sized + 'static {
    /// Collection whose revisions announce changes to this list.
    fn collection(brand: BrandId) -> Collection;

    fn slot(workspace: &mut BrandWorkspace) -> &mut Slot<Self>;

    async fn fetch(store: &Store, brand: BrandId) -> Result<Vec<Self>, RepositoryError>;

    async fn persist(
        store: &Store,
        brand: BrandId,
        save: &PendingSave<Self>,
    ) -> Result<Self, RepositoryError>;

    async fn remove(store: &Store, brand: BrandId, id: Self::Id) -> Result<(), RepositoryError>;
}

#[async_trait]
impl Listing for Order {
    fn collection(brand: BrandId) -> Collection {
        Collection::Orders(brand)
    }

    fn slot(workspace: &mut BrandWorkspace) -> &mut Slot<Self> {
        &mut workspace.orders
    }

    async fn fetch(store: &Store, brand: BrandId) -> Result<Vec<Self>, RepositoryError> {
        store.list_orders(brand).await
    }

    async fn persist(
        store: &Store,
        brand: BrandId,
        save: &PendingSave<Self>,
    ) -> Result<Self, RepositoryError> {
        store
            .commit_order(brand, save.id, save.expected_version, &save.commit)
            .await
    }

    async fn remove(store: &Store, brand: BrandId, id: Self::Id) -> Result<(), RepositoryError> {
        store.delete_order(brand, id).await
    }
}

#[async_trait]
impl Listing for Product {
    fn collection(brand: BrandId) -> Collection {
        Collection::Products(brand)
    }

    fn slot(workspace: &mut BrandWorkspace) -> &mut Slot<Self> {
        &mut workspace.products
    }

    async fn fetch(store: &Store, brand: BrandId) -> Result<Vec<Self>, RepositoryError> {
        store.list_products(brand).await
    }

    async fn persist(
        store: &Store,
        brand: BrandId,
        save: &PendingSave<Self>,
    ) -> Result<Self, RepositoryError> {
        store
            .update_product(brand, save.id, save.expected_version, &save.commit)
            .await
    }

    async fn remove(store: &Store, brand: BrandId, id: Self::Id) -> Result<(), RepositoryError> {
        store.delete_product(brand, id).await
    }
}

/// A rendered list: the active filter and the rows passing it.
#[derive(Debug, Serialize)]
#[serde(bound(
    serialize = "E: Serialize, E::Id: Serialize, E::Draft: Serialize, E::Facet: std::fmt::Display"
))]
pub struct ListView<'a, E: Editable + Faceted> {
    pub filter: Filter<E::Facet>,
    pub rows: Vec<RowView<'a, E>>,
}

impl BrandWorkspace {
    /// Orders open on `New`; products show everything.
    #[must_use]
    pub fn new(brand: BrandId) -> Self {
        Self {
            brand,
            orders: Slot::new(Filter::Only(OrderStatus::New)),
            products: Slot::new(Filter::All),
        }
    }

    #[must_use]
    pub const fn brand(&self) -> BrandId {
        self.brand
    }

    /// The list's controller, after pulling a snapshot if the store moved.
    ///
    /// # Errors
    ///
    /// Returns the store error if the snapshot cannot be read; the table is
    /// left as it was.
    pub async fn sync<E: Listing>(
        &mut self,
        store: &Store,
    ) -> Result<&mut TableState<E>, RepositoryError> {
        let brand = self.brand;
        let slot = E::slot(self);
        // Read before fetching so a write racing the fetch triggers another sync.
        let revision = store.hub().revision(E::collection(brand));

        if slot.seen != Some(revision) {
            let rows = E::fetch(store, brand).await?;
            let report = slot.table.apply_snapshot(rows);
            if !report.is_quiet() {
                tracing::info!(
                    %brand,
                    revision,
                    dropped = ?report.dropped,
                    settled = ?report.settled,
                    conflicted = ?report.conflicted,
                    "Snapshot reconciled edits"
                );
            }
            slot.seen = Some(revision);
        }
        Ok(&mut slot.table)
    }

    /// Save a row's draft through the store.
    ///
    /// A version mismatch leaves the row in conflict with the draft intact;
    /// a missing row drops the draft; any other failure keeps the draft for
    /// a retry.
    ///
    /// # Errors
    ///
    /// Returns the table's refusal or the store's error.
    #[tracing::instrument(skip(self, store), fields(brand = %self.brand))]
    pub async fn save<E: Listing>(&mut self, store: &Store, id: E::Id) -> Result<E, ServiceError> {
        let brand = self.brand;
        let table = self.sync::<E>(store).await?;
        let pending = table.save_changes(id, Utc::now())?;

        match E::persist(store, brand, &pending).await {
            Ok(saved) => {
                table.complete_save(saved.clone());
                tracing::info!(version = saved.version(), "Row saved");
                Ok(saved)
            }
            Err(e) => {
                let failure = match &e {
                    RepositoryError::VersionConflict { current } => SaveFailure::Conflict {
                        server_version: *current,
                    },
                    RepositoryError::NotFound => SaveFailure::Gone,
                    _ => SaveFailure::Other,
                };
                tracing::warn!(error = %e, ?failure, "Save failed");
                let stale = matches!(failure, SaveFailure::Conflict { .. });
                table.fail_save(id, failure);
                if stale {
                    // The newer row may not be published yet; refetch on next sync.
                    E::slot(self).seen = None;
                }
                Err(e.into())
            }
        }
    }

    /// Delete a row after confirmation.
    ///
    /// # Errors
    ///
    /// Returns `TableError::ConfirmationRequired` without `confirmed`, or the
    /// store's error.
    #[tracing::instrument(skip(self, store), fields(brand = %self.brand))]
    pub async fn delete<E: Listing>(
        &mut self,
        store: &Store,
        id: E::Id,
        confirmed: bool,
    ) -> Result<(), ServiceError> {
        let brand = self.brand;
        let table = self.sync::<E>(store).await?;
        let id = table.delete_entity(id, confirmed)?;

        match E::remove(store, brand, id).await {
            Ok(()) => {
                table.complete_delete(id);
                tracing::info!("Row deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => {
                table.complete_delete(id);
                Err(RepositoryError::NotFound.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Render a list as JSON.
///
/// # Errors
///
/// Returns an error if a row cannot be serialized.
pub fn render<E>(table: &TableState<E>) -> Result<serde_json::Value, serde_json::Error>
where
    E: Editable + Faceted + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display,
{
    serde_json::to_value(ListView {
        filter: table.filter(),
        rows: table.view(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rabit_core::models::{NewOrder, OrderChange, ProductFields};
    use rabit_core::view::{ConflictResolution, RowState, TableError};

    use super::*;

    const BRAND: BrandId = BrandId::new(1);

    fn fields(name: &str) -> ProductFields {
        ProductFields {
            name: name.to_string(),
            sku: "SKU-1".to_string(),
            quantity: 3,
            image_url: "https://placehold.co/80x80.png".to_string(),
            active: true,
        }
    }

    fn new_order() -> NewOrder {
        NewOrder {
            customer_name: "Jane Doe".to_string(),
            customer_phone: "0123456789".to_string(),
            destination: "12 Harbour Road".to_string(),
            items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_sync_only_refetches_after_writes() {
        let store = Store::memory();
        let mut ws = BrandWorkspace::new(BRAND);
        assert!(ws.sync::<Product>(&store).await.unwrap().rows().is_empty());

        store.create_product(BRAND, &fields("Shirt")).await.unwrap();
        assert_eq!(ws.sync::<Product>(&store).await.unwrap().rows().len(), 1);
    }

    #[tokio::test]
    async fn test_save_writes_and_clears_draft() {
        let store = Store::memory();
        let product = store.create_product(BRAND, &fields("Shirt")).await.unwrap();
        let mut ws = BrandWorkspace::new(BRAND);

        ws.sync::<Product>(&store)
            .await
            .unwrap()
            .field_change(
                product.id,
                rabit_core::models::ProductChange::Name("Linen Shirt".to_string()),
            )
            .unwrap();
        let saved = ws.save::<Product>(&store, product.id).await.unwrap();
        assert_eq!(saved.name, "Linen Shirt");

        let table = ws.sync::<Product>(&store).await.unwrap();
        assert_eq!(table.state_of(product.id), Some(RowState::Clean));
        assert_eq!(table.rows()[0].name, "Linen Shirt");
    }

    #[tokio::test]
    async fn test_other_users_write_conflicts_dirty_row() {
        let store = Store::memory();
        let order = store.create_order(BRAND, &new_order()).await.unwrap();
        let mut mine = BrandWorkspace::new(BRAND);
        let mut theirs = BrandWorkspace::new(BRAND);

        mine.sync::<Order>(&store)
            .await
            .unwrap()
            .field_change(order.id, OrderChange::Driver("Sam".to_string()))
            .unwrap();
        theirs
            .sync::<Order>(&store)
            .await
            .unwrap()
            .field_change(order.id, OrderChange::Driver("Alex".to_string()))
            .unwrap();
        theirs.save::<Order>(&store, order.id).await.unwrap();

        let table = mine.sync::<Order>(&store).await.unwrap();
        assert_eq!(table.state_of(order.id), Some(RowState::Conflict));
        assert_eq!(table.draft_of(order.id).unwrap().driver, "Sam");
        assert!(matches!(
            mine.save::<Order>(&store, order.id).await,
            Err(ServiceError::Table(TableError::Conflict(_)))
        ));

        mine.sync::<Order>(&store)
            .await
            .unwrap()
            .resolve_conflict(order.id, ConflictResolution::KeepMine)
            .unwrap();
        let saved = mine.save::<Order>(&store, order.id).await.unwrap();
        assert_eq!(saved.driver.as_deref(), Some("Sam"));
        assert_eq!(saved.version, 3);
    }

    #[tokio::test]
    async fn test_refused_save_refetches_before_keeping_draft() {
        let store = Store::memory();
        let order = store.create_order(BRAND, &new_order()).await.unwrap();
        let mut mine = BrandWorkspace::new(BRAND);
        let mut theirs = BrandWorkspace::new(BRAND);

        mine.sync::<Order>(&store)
            .await
            .unwrap()
            .field_change(order.id, OrderChange::Driver("Sam".to_string()))
            .unwrap();
        theirs
            .sync::<Order>(&store)
            .await
            .unwrap()
            .field_change(order.id, OrderChange::Driver("Lee".to_string()))
            .unwrap();
        theirs.save::<Order>(&store, order.id).await.unwrap();
        // Act as if their write had not been announced yet
        mine.orders.seen = Some(store.hub().revision(Order::collection(BRAND)));

        assert!(matches!(
            mine.save::<Order>(&store, order.id).await,
            Err(ServiceError::Repository(RepositoryError::VersionConflict { current: 2 }))
        ));
        assert_eq!(mine.orders.seen, None);
        assert_eq!(
            mine.orders
                .table
                .resolve_conflict(order.id, ConflictResolution::KeepMine),
            Err(TableError::Stale(order.id.to_string()))
        );

        mine.sync::<Order>(&store)
            .await
            .unwrap()
            .resolve_conflict(order.id, ConflictResolution::KeepMine)
            .unwrap();
        let saved = mine.save::<Order>(&store, order.id).await.unwrap();
        assert_eq!(saved.driver.as_deref(), Some("Sam"));
        assert_eq!(saved.version, 3);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let store = Store::memory();
        let order = store.create_order(BRAND, &new_order()).await.unwrap();
        let mut ws = BrandWorkspace::new(BRAND);

        assert!(matches!(
            ws.delete::<Order>(&store, order.id, false).await,
            Err(ServiceError::Table(TableError::ConfirmationRequired))
        ));
        ws.delete::<Order>(&store, order.id, true).await.unwrap();
        assert!(ws.sync::<Order>(&store).await.unwrap().rows().is_empty());
        assert!(store.list_orders(BRAND).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registry_reuses_workspace() {
        let registry = WorkspaceRegistry::new(Duration::from_secs(60));
        let first = registry.open(UserId::new(1), BRAND).await;
        let again = registry.open(UserId::new(1), BRAND).await;
        let other = registry.open(UserId::new(2), BRAND).await;
        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn test_close_all_drops_workspaces_and_announces_user() {
        let registry = WorkspaceRegistry::new(Duration::from_secs(60));
        let mut closed = registry.closed();
        let first = registry.open(UserId::new(1), BRAND).await;
        let kept = registry.open(UserId::new(2), BRAND).await;

        registry.close_all(UserId::new(1)).await;

        assert_eq!(closed.recv().await.unwrap(), UserId::new(1));
        assert!(!Arc::ptr_eq(&first, &registry.open(UserId::new(1), BRAND).await));
        assert!(Arc::ptr_eq(&kept, &registry.open(UserId::new(2), BRAND).await));
    }

    #[tokio::test]
    async fn test_new_workspace_shows_new_orders() {
        let ws = BrandWorkspace::new(BRAND);
        assert_eq!(ws.orders.table.filter(), Filter::Only(OrderStatus::New));
        assert_eq!(ws.products.table.filter(), Filter::All);
    }
}
