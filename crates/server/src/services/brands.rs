//! Brand creation and lookup.

use serde::Serialize;

use rabit_core::FieldErrors;
use rabit_core::models::{Brand, BrandInput};

use crate::models::CurrentUser;
use crate::store::Store;

use super::ServiceError;

/// What the signed-in user sees about themselves.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: CurrentUser,
    pub brand: Option<Brand>,
    pub is_admin: bool,
}

/// The user's profile with their brand, if they own one.
///
/// # Errors
///
/// Propagates store failures.
pub async fn profile(store: &Store, user: CurrentUser) -> Result<Profile, ServiceError> {
    let brand = store.brand_by_owner(user.id).await?;
    Ok(Profile {
        is_admin: user.is_admin(),
        user,
        brand,
    })
}

/// Create a brand owned by the signed-in user.
///
/// Any `owner_id` on the form is ignored.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` for a bad form and
/// `RepositoryError::Conflict` if the user already owns a brand.
#[tracing::instrument(skip(store, input), fields(user_id = %user.id))]
pub async fn create_own_brand(
    store: &Store,
    user: &CurrentUser,
    input: BrandInput,
) -> Result<Brand, ServiceError> {
    let brand = input.into_new_brand(user.id)?;
    let created = store.create_brand(&brand).await?;
    tracing::info!(brand_id = %created.id, "Brand created");
    Ok(created)
}

/// Create a brand for the user named by `owner_id`.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` for a bad form or an unknown owner, and
/// `RepositoryError::Conflict` if the owner already has a brand.
#[tracing::instrument(skip(store, input), fields(owner_id = ?input.owner_id))]
pub async fn create_brand_for_owner(
    store: &Store,
    input: BrandInput,
) -> Result<Brand, ServiceError> {
    let Some(owner) = input.owner_id else {
        return Err(FieldErrors::single("owner_id", "Please select an owner.").into());
    };
    let brand = input.into_new_brand(owner)?;

    if store.user_by_id(owner).await?.is_none() {
        return Err(FieldErrors::single("owner_id", "Owner not found.").into());
    }

    let created = store.create_brand(&brand).await?;
    tracing::info!(brand_id = %created.id, "Brand created by admin");
    Ok(created)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rabit_core::{Email, UserId, UserRole};
    use rabit_core::models::NewUser;

    use crate::db::RepositoryError;

    use super::*;

    fn form(owner: Option<UserId>) -> BrandInput {
        BrandInput {
            name: "Acme Goods".to_string(),
            logo: None,
            phone: "0123456789".to_string(),
            owner_id: owner,
        }
    }

    async fn owner(store: &Store) -> CurrentUser {
        let user = store
            .create_user(&NewUser {
                email: Email::parse("owner@example.com").unwrap(),
                name: "Owner".to_string(),
                role: UserRole::Owner,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        CurrentUser::from(&user)
    }

    #[tokio::test]
    async fn test_one_brand_per_owner() {
        let store = Store::memory();
        let user = owner(&store).await;

        let brand = create_own_brand(&store, &user, form(Some(UserId::new(99))))
            .await
            .unwrap();
        assert_eq!(brand.owner, user.id);

        let err = create_own_brand(&store, &user, form(None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repository(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_form_needs_existing_owner() {
        let store = Store::memory();

        let err = create_brand_for_owner(&store, form(None)).await.unwrap_err();
        let ServiceError::Invalid(fields) = err else {
            panic!("expected field errors");
        };
        assert_eq!(fields.get("owner_id").unwrap(), ["Please select an owner."]);

        let err = create_brand_for_owner(&store, form(Some(UserId::new(42))))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));

        let user = owner(&store).await;
        let brand = create_brand_for_owner(&store, form(Some(user.id)))
            .await
            .unwrap();
        assert_eq!(brand.owner, user.id);

        let profile = profile(&store, user).await.unwrap();
        assert_eq!(profile.brand.unwrap().id, brand.id);
        assert!(!profile.is_admin);
    }
}
