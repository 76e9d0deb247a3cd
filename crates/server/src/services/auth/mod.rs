//! Authentication service.
//!
//! Email and password login with Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use rabit_core::models::{NewUser, User};
use rabit_core::{Email, UserRole};

use crate::db::RepositoryError;
use crate::store::Store;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a Store,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Create an account with a password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register_with_password(
        &self,
        email: &str,
        name: &str,
        role: UserRole,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.store
            .create_user(&NewUser {
                email,
                name: name.trim().to_owned(),
                role,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountDisabled` if the password is right but the
    /// account is disabled.
    #[tracing::instrument(skip(self, password))]
    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if user.disabled {
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_messages() {
        let store = Store::memory();
        let auth = AuthService::new(&store);
        auth.register_with_password("owner@example.com", "Owner", UserRole::Owner, "s3cret-pass")
            .await
            .unwrap();

        let user = auth
            .login_with_password("Owner@Example.com", "s3cret-pass")
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "owner@example.com");

        let err = auth
            .login_with_password("owner@example.com", "nope-nope")
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "Invalid email or password. Please try again."
        );

        let err = auth
            .login_with_password("nobody@example.com", "s3cret-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = auth
            .login_with_password("not an email", "s3cret-pass")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Please enter a valid email address.");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_short_passwords() {
        let store = Store::memory();
        let auth = AuthService::new(&store);
        let err = auth
            .register_with_password("a@example.com", "A", UserRole::Owner, "short")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));

        auth.register_with_password("a@example.com", "A", UserRole::Owner, "long-enough")
            .await
            .unwrap();
        let err = auth
            .register_with_password("a@example.com", "A", UserRole::Owner, "long-enough")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[test]
    fn test_internal_errors_use_generic_message() {
        let err = AuthError::Repository(RepositoryError::NotFound);
        assert!(err.is_internal());
        assert_eq!(err.user_message(), "Login failed. Please try again later.");
    }
}
