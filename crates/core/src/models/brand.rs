//! Brands (tenants).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{BrandId, FieldErrors, UserId};

/// A tenant owning products and orders.
///
/// Brands are never hard-deleted; the `deleted` flag hides them from listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    /// Unique brand ID.
    pub id: BrandId,
    /// Display name.
    pub name: String,
    /// Logo URL (a placeholder when none was given).
    pub logo: String,
    /// Contact phone number.
    pub phone: String,
    /// Owning user.
    pub owner: UserId,
    pub active: bool,
    pub deleted: bool,
    /// Bumped on every write.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Brand creation form.
///
/// `owner_id` is only read on the admin form; owners always create brands for
/// themselves.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BrandInput {
    #[validate(length(min = 2, message = "Brand name must be at least 2 characters."))]
    pub name: String,
    #[validate(url(message = "Please enter a valid URL for the logo."))]
    #[serde(default)]
    pub logo: Option<String>,
    #[validate(length(min = 10, message = "Please enter a valid phone number."))]
    pub phone: String,
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

/// Validated brand ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBrand {
    pub name: String,
    pub logo: String,
    pub phone: String,
    pub owner: UserId,
}

impl BrandInput {
    /// Trim the form, validate it and attach the owner.
    ///
    /// A blank logo becomes a lettered placeholder image.
    ///
    /// # Errors
    ///
    /// Returns per-field messages when the form is invalid.
    pub fn into_new_brand(self, owner: UserId) -> Result<NewBrand, FieldErrors> {
        let input = Self {
            name: self.name.trim().to_owned(),
            logo: self
                .logo
                .map(|logo| logo.trim().to_owned())
                .filter(|logo| !logo.is_empty()),
            phone: self.phone.trim().to_owned(),
            owner_id: self.owner_id,
        };
        input.validate()?;

        let logo = input
            .logo
            .unwrap_or_else(|| placeholder_logo(&input.name));
        Ok(NewBrand {
            name: input.name,
            logo,
            phone: input.phone,
            owner,
        })
    }
}

/// Placeholder logo lettered with the brand's initial.
#[must_use]
pub fn placeholder_logo(name: &str) -> String {
    let initial = name.chars().next().map(|c| c.to_uppercase().to_string());
    format!(
        "https://placehold.co/100x100.png?text={}",
        initial.unwrap_or_default()
    )
}
