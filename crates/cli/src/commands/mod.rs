//! CLI command implementations.
//!
//! # Environment Variables
//!
//! - `RABIT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

pub mod brands;
pub mod migrate;
pub mod users;

use secrecy::SecretString;
use thiserror::Error;

use rabit_server::db::RepositoryError;
use rabit_server::services::AuthError;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invalid argument.
    #[error("Invalid {0}: {1}")]
    Invalid(&'static str, String),

    /// User creation failed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Store operation failed.
    #[error("{0}")]
    Repository(#[from] RepositoryError),
}

/// Database URL from the environment, loading `.env` first.
pub(crate) fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();
    std::env::var("RABIT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("RABIT_DATABASE_URL"))
}

/// Connect to the database named by the environment.
pub(crate) async fn connect() -> Result<sqlx::PgPool, CliError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(rabit_server::db::create_pool(&url).await?)
}
