//! Brand management commands.

use rabit_core::Email;
use rabit_core::models::BrandInput;
use rabit_server::store::Store;

use super::CliError;

/// Create a brand for the user with email `owner`.
///
/// # Errors
///
/// Returns an error if the owner does not exist, the form is invalid, the
/// owner already has a brand, or the database fails.
pub async fn create(
    owner: &str,
    name: String,
    phone: String,
    logo: Option<String>,
) -> Result<(), CliError> {
    let email = Email::parse(owner).map_err(|e| CliError::Invalid("owner email", e.to_string()))?;

    let store = Store::postgres(super::connect().await?);
    let (user, _) = store
        .user_by_email(&email)
        .await?
        .ok_or_else(|| CliError::Invalid("owner", format!("no user with email {email}")))?;

    let input = BrandInput {
        name,
        logo,
        phone,
        owner_id: Some(user.id),
    };
    let brand = input
        .into_new_brand(user.id)
        .map_err(|errors| CliError::Invalid("brand", format!("{errors:?}")))?;
    let created = store.create_brand(&brand).await?;

    tracing::info!(
        "Brand created successfully! ID: {}, Name: {}, Owner: {}",
        created.id,
        created.name,
        email
    );
    Ok(())
}
