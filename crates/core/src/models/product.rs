//! Catalog products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{Availability, BrandId, FieldErrors, ProductId};
use crate::view::{ChangeError, Editable, Faceted};

/// Image used when a product has none.
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/80x80.png";

/// A product in a brand's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Owning brand.
    pub brand_id: BrandId,
    pub name: String,
    pub sku: String,
    /// Image URL (a placeholder when none was given).
    pub image_url: String,
    /// Units on hand, never negative.
    pub quantity: i32,
    /// Inactive products cannot be added to new orders.
    pub active: bool,
    /// Soft-delete flag; deleted products never appear in listings.
    pub deleted: bool,
    /// Bumped on every write.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product form, used for creation and for validating table edits.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 3, message = "Name must be at least 3 characters."))]
    pub name: String,
    #[validate(length(min = 3, message = "SKU must be at least 3 characters."))]
    pub sku: String,
    #[validate(range(min = 0, message = "Quantity cannot be negative."))]
    #[serde(default)]
    pub quantity: i32,
    #[validate(url(message = "Please enter a valid URL."))]
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// The editable fields of a product, validated and normalized.
///
/// Doubles as the table draft and as the write payload for both create and
/// update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFields {
    pub name: String,
    pub sku: String,
    pub quantity: i32,
    pub image_url: String,
    pub active: bool,
}

impl ProductInput {
    /// Trim, validate and fill in the placeholder image.
    ///
    /// # Errors
    ///
    /// Returns per-field messages when the form is invalid.
    pub fn validated(self) -> Result<ProductFields, FieldErrors> {
        let input = Self {
            name: self.name.trim().to_owned(),
            sku: self.sku.trim().to_owned(),
            quantity: self.quantity,
            image_url: self
                .image_url
                .map(|url| url.trim().to_owned())
                .filter(|url| !url.is_empty() && url != PLACEHOLDER_IMAGE),
            active: self.active,
        };
        input.validate()?;

        Ok(ProductFields {
            name: input.name,
            sku: input.sku,
            quantity: input.quantity,
            image_url: input
                .image_url
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_owned()),
            active: input.active,
        })
    }
}

impl From<ProductFields> for ProductInput {
    fn from(fields: ProductFields) -> Self {
        Self {
            name: fields.name,
            sku: fields.sku,
            quantity: fields.quantity,
            image_url: Some(fields.image_url),
            active: fields.active,
        }
    }
}

/// A single edit to a product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ProductChange {
    Name(String),
    Sku(String),
    Quantity(i32),
    ImageUrl(String),
    Active(bool),
}

impl Editable for Product {
    type Id = ProductId;
    type Draft = ProductFields;
    type Change = ProductChange;
    type Commit = ProductFields;

    fn id(&self) -> ProductId {
        self.id
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn draft(&self) -> ProductFields {
        ProductFields {
            name: self.name.clone(),
            sku: self.sku.clone(),
            quantity: self.quantity,
            image_url: self.image_url.clone(),
            active: self.active,
        }
    }

    fn apply_change(draft: &mut ProductFields, change: ProductChange) -> Result<(), ChangeError> {
        match change {
            ProductChange::Name(name) => draft.name = name,
            ProductChange::Sku(sku) => draft.sku = sku,
            ProductChange::Quantity(quantity) => draft.quantity = quantity,
            ProductChange::ImageUrl(url) => draft.image_url = url,
            ProductChange::Active(active) => draft.active = active,
        }
        Ok(())
    }

    fn commit(
        &self,
        draft: &ProductFields,
        _now: DateTime<Utc>,
    ) -> Result<ProductFields, FieldErrors> {
        ProductInput::from(draft.clone()).validated()
    }
}

impl Faceted for Product {
    type Facet = Availability;

    fn facet(&self) -> Availability {
        if self.active {
            Availability::Active
        } else {
            Availability::Inactive
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "Linen Shirt".into(),
            sku: "LS-001".into(),
            quantity: 4,
            image_url: None,
            active: true,
        }
    }

    #[test]
    fn test_validated_fills_placeholder_image() {
        let fields = input().validated().unwrap();
        assert_eq!(fields.image_url, PLACEHOLDER_IMAGE);
        assert_eq!(fields.name, "Linen Shirt");
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let errors = ProductInput {
            quantity: -1,
            ..input()
        }
        .validated()
        .unwrap_err();
        assert_eq!(
            errors.get("quantity").unwrap(),
            ["Quantity cannot be negative."]
        );
    }

    #[test]
    fn test_placeholder_image_survives_revalidation() {
        let fields = input().validated().unwrap();
        let again = ProductInput::from(fields.clone()).validated().unwrap();
        assert_eq!(again, fields);
    }

    #[test]
    fn test_change_deserializes_from_tagged_json() {
        let change: ProductChange =
            serde_json::from_value(serde_json::json!({"field": "quantity", "value": 12}))
                .unwrap();
        assert_eq!(change, ProductChange::Quantity(12));
    }
}
