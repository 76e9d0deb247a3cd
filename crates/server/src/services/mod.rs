//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Email and password login
//! - `brands` - Brand creation for owners and admins
//! - `orders` - Order creation against the brand's catalog
//! - `products` - Product creation
//! - `shipping` - AI shipping company suggestions
//! - `workspace` - Per-user table controllers synced to the store

pub mod auth;
pub mod brands;
pub mod orders;
pub mod products;
pub mod shipping;
pub mod workspace;

use thiserror::Error;

use rabit_core::FieldErrors;
use rabit_core::view::TableError;

use crate::db::RepositoryError;
use crate::error::AppError;

pub use auth::{AuthError, AuthService};
pub use shipping::{ShippingError, ShippingRequest, ShippingSuggestion, suggest_shipping};
pub use workspace::{BrandWorkspace, Listing, WorkspaceRegistry};

/// Errors from the brand, order, product and workspace services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("validation failed")]
    Invalid(FieldErrors),
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::Invalid(errors)
    }
}

impl From<ServiceError> for AppError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Repository(e) => Self::Repository(e),
            ServiceError::Table(e) => Self::Table(e),
            ServiceError::Invalid(fields) => Self::Validation(fields),
        }
    }
}
