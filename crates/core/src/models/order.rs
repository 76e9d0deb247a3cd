//! Shipping orders and their notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

use crate::models::Product;
use crate::types::{BrandId, FieldErrors, NoteId, OrderId, OrderStatus, ProductId};
use crate::view::{ChangeError, Editable, Faceted};

/// Product data copied into an order line when the order is placed.
///
/// Later catalog edits do not rewrite existing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub image_url: String,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            image_url: product.image_url.clone(),
        }
    }
}

/// One order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductSnapshot,
    pub quantity: i32,
}

/// A free-text note attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}

/// A shipping order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Owning brand.
    pub brand_id: BrandId,
    pub customer_name: String,
    pub customer_phone: String,
    pub destination: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    /// Notes, oldest first.
    pub notes: Vec<Note>,
    pub shipping_company: Option<String>,
    pub driver: Option<String>,
    /// Bumped on every write.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the order enters `Shipped`, cleared when it leaves.
    pub shipped_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Creation
// =============================================================================

/// Order creation form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderInput {
    #[validate(length(min = 3, message = "Customer name must be at least 3 characters."))]
    pub customer_name: String,
    #[validate(length(min = 10, message = "Please enter a valid phone number."))]
    pub customer_phone: String,
    #[validate(length(min = 5, message = "Destination must be at least 5 characters."))]
    pub destination: String,
    #[validate(
        length(min = 1, message = "Please add at least one item to the order."),
        nested
    )]
    pub items: Vec<OrderItemInput>,
}

/// One line of the creation form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemInput {
    pub product_id: ProductId,
    #[validate(range(min = 1, message = "Quantity must be at least 1."))]
    pub quantity: i32,
}

/// Validated order ready to insert, with product snapshots resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: String,
    pub destination: String,
    pub items: Vec<OrderItem>,
}

impl OrderInput {
    /// Validate the form and resolve each line against the brand's catalog.
    ///
    /// Only active, non-deleted products of the catalog can be ordered.
    ///
    /// # Errors
    ///
    /// Returns per-field messages, with line errors keyed `items[i].field`.
    pub fn into_new_order(self, catalog: &[Product]) -> Result<NewOrder, FieldErrors> {
        let input = Self {
            customer_name: self.customer_name.trim().to_owned(),
            customer_phone: self.customer_phone.trim().to_owned(),
            destination: self.destination.trim().to_owned(),
            items: self.items,
        };
        input.validate()?;

        let mut errors = FieldErrors::new();
        let mut items = Vec::with_capacity(input.items.len());
        for (index, line) in input.items.iter().enumerate() {
            let product = catalog
                .iter()
                .find(|p| p.id == line.product_id && p.active && !p.deleted);
            match product {
                Some(product) => items.push(OrderItem {
                    product: ProductSnapshot::from(product),
                    quantity: line.quantity,
                }),
                None => errors.add(
                    format!("items[{index}].product_id"),
                    "Please select a product.",
                ),
            }
        }
        errors.into_result()?;

        Ok(NewOrder {
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            destination: input.destination,
            items,
        })
    }
}

// =============================================================================
// Editing
// =============================================================================

/// A note as it appears in an edit buffer; `id` is `None` until committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub id: Option<NoteId>,
    pub content: String,
    pub resolved: bool,
}

/// The editable part of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub status: OrderStatus,
    pub shipping_company: String,
    pub driver: String,
    pub notes: Vec<NoteDraft>,
}

/// A single edit to an order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum OrderChange {
    ShippingCompany(String),
    Driver(String),
    Status(OrderStatus),
    AddNote(String),
    SetNoteResolved { note: NoteId, resolved: bool },
}

/// What happens to `shipped_at` when an update is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShippedAtChange {
    /// Leave the stored value alone.
    Keep,
    /// Stamp the order as shipped at this instant.
    Set(DateTime<Utc>),
    /// Write null.
    Clear,
}

impl ShippedAtChange {
    #[must_use]
    pub const fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

impl Serialize for ShippedAtChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Set(at) => at.serialize(serializer),
            Self::Keep | Self::Clear => serializer.serialize_none(),
        }
    }
}

/// The order write payload: the whole edit buffer plus the `shipped_at`
/// side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub shipping_company: Option<String>,
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "ShippedAtChange::is_keep")]
    pub shipped_at: ShippedAtChange,
}

impl OrderUpdate {
    /// Build the write for `draft` applied on top of `original`.
    ///
    /// Entering `Shipped` stamps `shipped_at` with `now`; leaving it clears
    /// the stamp; anything else keeps it.
    #[must_use]
    pub fn from_edit(original: &Order, draft: &OrderDraft, now: DateTime<Utc>) -> Self {
        let was_shipped = original.status == OrderStatus::Shipped;
        let is_shipped = draft.status == OrderStatus::Shipped;
        let shipped_at = match (was_shipped, is_shipped) {
            (false, true) => ShippedAtChange::Set(now),
            (true, false) => ShippedAtChange::Clear,
            _ => ShippedAtChange::Keep,
        };

        Self {
            status: draft.status,
            shipping_company: non_blank(&draft.shipping_company),
            driver: non_blank(&draft.driver),
            shipped_at,
        }
    }

    /// Apply the write to an in-memory order.
    pub fn apply_to(&self, order: &mut Order) {
        order.status = self.status;
        order.shipping_company.clone_from(&self.shipping_company);
        order.driver.clone_from(&self.driver);
        match self.shipped_at {
            ShippedAtChange::Keep => {}
            ShippedAtChange::Set(at) => order.shipped_at = Some(at),
            ShippedAtChange::Clear => order.shipped_at = None,
        }
    }
}

/// A note staged for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNote {
    pub content: String,
}

/// Everything one order save writes, applied atomically by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderCommit {
    pub update: OrderUpdate,
    pub new_notes: Vec<NewNote>,
    pub note_resolutions: Vec<(NoteId, bool)>,
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

impl Editable for Order {
    type Id = OrderId;
    type Draft = OrderDraft;
    type Change = OrderChange;
    type Commit = OrderCommit;

    fn id(&self) -> OrderId {
        self.id
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn draft(&self) -> OrderDraft {
        OrderDraft {
            status: self.status,
            shipping_company: self.shipping_company.clone().unwrap_or_default(),
            driver: self.driver.clone().unwrap_or_default(),
            notes: self
                .notes
                .iter()
                .map(|note| NoteDraft {
                    id: Some(note.id),
                    content: note.content.clone(),
                    resolved: note.resolved,
                })
                .collect(),
        }
    }

    fn apply_change(draft: &mut OrderDraft, change: OrderChange) -> Result<(), ChangeError> {
        match change {
            OrderChange::ShippingCompany(company) => draft.shipping_company = company,
            OrderChange::Driver(driver) => draft.driver = driver,
            OrderChange::Status(status) => draft.status = status,
            OrderChange::AddNote(content) => {
                let content = content.trim();
                if content.is_empty() {
                    return Err(ChangeError::EmptyNote);
                }
                draft.notes.push(NoteDraft {
                    id: None,
                    content: content.to_owned(),
                    resolved: false,
                });
            }
            OrderChange::SetNoteResolved { note, resolved } => {
                let target = draft
                    .notes
                    .iter_mut()
                    .find(|n| n.id == Some(note))
                    .ok_or_else(|| ChangeError::UnknownNote(note.to_string()))?;
                target.resolved = resolved;
            }
        }
        Ok(())
    }

    fn commit(&self, draft: &OrderDraft, now: DateTime<Utc>) -> Result<OrderCommit, FieldErrors> {
        let new_notes = draft
            .notes
            .iter()
            .filter(|note| note.id.is_none())
            .map(|note| NewNote {
                content: note.content.clone(),
            })
            .collect();

        let note_resolutions = draft
            .notes
            .iter()
            .filter_map(|note| {
                let id = note.id?;
                let stored = self.notes.iter().find(|n| n.id == id)?;
                (stored.resolved != note.resolved).then_some((id, note.resolved))
            })
            .collect();

        Ok(OrderCommit {
            update: OrderUpdate::from_edit(self, draft, now),
            new_notes,
            note_resolutions,
        })
    }
}

impl Faceted for Order {
    type Facet = OrderStatus;

    fn facet(&self) -> OrderStatus {
        self.status
    }
}
