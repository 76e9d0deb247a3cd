//! Order creation.

use rabit_core::BrandId;
use rabit_core::models::{Order, OrderInput};

use crate::store::Store;

use super::ServiceError;

/// Validate the form against the brand's live catalog and create the order.
///
/// Items are snapshotted from the products at creation time. The order
/// starts as `New` with no ship date.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` with per-field messages (including items
/// naming inactive or unknown products), or the store's error.
#[tracing::instrument(skip(store, input), fields(%brand))]
pub async fn create_order(
    store: &Store,
    brand: BrandId,
    input: OrderInput,
) -> Result<Order, ServiceError> {
    let catalog = store.list_products(brand).await?;
    let order = input.into_new_order(&catalog)?;
    let created = store.create_order(brand, &order).await?;
    tracing::info!(order_id = %created.id, items = created.items.len(), "Order created");
    Ok(created)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rabit_core::OrderStatus;
    use rabit_core::models::{OrderItemInput, ProductFields};

    use super::*;

    fn fields(active: bool) -> ProductFields {
        ProductFields {
            name: "Linen Shirt".to_string(),
            sku: "LS-001".to_string(),
            quantity: 5,
            image_url: "https://placehold.co/80x80.png".to_string(),
            active,
        }
    }

    fn form(product: rabit_core::ProductId) -> OrderInput {
        OrderInput {
            customer_name: "Jane Doe".to_string(),
            customer_phone: "0123456789".to_string(),
            destination: "12 Harbour Road".to_string(),
            items: vec![OrderItemInput {
                product_id: product,
                quantity: 2,
            }],
        }
    }

    #[tokio::test]
    async fn test_new_order_snapshots_products() {
        let store = Store::memory();
        let brand = BrandId::new(1);
        let product = store.create_product(brand, &fields(true)).await.unwrap();

        let order = create_order(&store, brand, form(product.id)).await.unwrap();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.shipped_at, None);
        assert_eq!(order.items[0].product.sku, "LS-001");
        assert_eq!(order.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_inactive_product_rejected() {
        let store = Store::memory();
        let brand = BrandId::new(1);
        let product = store.create_product(brand, &fields(false)).await.unwrap();

        let err = create_order(&store, brand, form(product.id))
            .await
            .unwrap_err();
        let ServiceError::Invalid(errors) = err else {
            panic!("expected field errors");
        };
        assert!(errors.get("items[0].product_id").is_some());
    }

    #[tokio::test]
    async fn test_other_brands_products_rejected() {
        let store = Store::memory();
        let product = store
            .create_product(BrandId::new(2), &fields(true))
            .await
            .unwrap();

        assert!(matches!(
            create_order(&store, BrandId::new(1), form(product.id)).await,
            Err(ServiceError::Invalid(_))
        ));
    }
}
