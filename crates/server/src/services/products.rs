//! Product creation.

use rabit_core::BrandId;
use rabit_core::models::{Product, ProductInput};

use crate::store::Store;

use super::ServiceError;

/// Validate the form and add the product to the brand's catalog.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` with per-field messages, or the store's
/// error.
#[tracing::instrument(skip(store, input), fields(%brand))]
pub async fn create_product(
    store: &Store,
    brand: BrandId,
    input: ProductInput,
) -> Result<Product, ServiceError> {
    let fields = input.validated()?;
    let created = store.create_product(brand, &fields).await?;
    tracing::info!(product_id = %created.id, "Product created");
    Ok(created)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_form_writes_nothing() {
        let store = Store::memory();
        let brand = BrandId::new(1);
        let err = create_product(
            &store,
            brand,
            ProductInput {
                name: "ab".to_string(),
                sku: "SKU-1".to_string(),
                quantity: 1,
                image_url: None,
                active: true,
            },
        )
        .await
        .unwrap_err();

        let ServiceError::Invalid(fields) = err else {
            panic!("expected field errors");
        };
        assert!(fields.get("name").is_some());
        assert!(store.list_products(brand).await.unwrap().is_empty());
    }
}
