//! User management commands.

use rabit_core::UserRole;
use rabit_server::services::AuthService;
use rabit_server::store::Store;

use super::CliError;

/// Create a user with a password.
///
/// # Errors
///
/// Returns an error for an unknown role, a missing password, a weak
/// password, a duplicate email or a database failure.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: Option<String>,
) -> Result<(), CliError> {
    let role: UserRole = role
        .parse()
        .map_err(|e: String| CliError::Invalid("role", e))?;
    let password = password
        .or_else(|| std::env::var("RABIT_USER_PASSWORD").ok())
        .ok_or(CliError::MissingEnvVar("RABIT_USER_PASSWORD"))?;

    let store = Store::postgres(super::connect().await?);
    let user = AuthService::new(&store)
        .register_with_password(email, name, role, &password)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}
