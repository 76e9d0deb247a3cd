//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] rabit_core::EmailError),

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but may not log in.
    #[error("account disabled")]
    AccountDisabled,

    /// Password doesn't meet requirements.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// A user with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password hashing failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    /// The message shown on the login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password. Please try again.".to_owned(),
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_owned(),
            Self::AccountDisabled => "This account has been disabled.".to_owned(),
            Self::WeakPassword(reason) => reason.clone(),
            Self::UserAlreadyExists => "An account with this email already exists.".to_owned(),
            Self::PasswordHash | Self::Repository(_) => {
                "Login failed. Please try again later.".to_owned()
            }
        }
    }

    /// Whether this is the server's fault rather than the caller's.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::PasswordHash | Self::Repository(_))
    }
}
