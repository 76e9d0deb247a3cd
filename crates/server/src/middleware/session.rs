//! Session middleware configuration.
//!
//! Sessions live in `PostgreSQL` (`rabit.session`) for the postgres backend
//! and in process memory for the memory backend. Cookies are `HttpOnly`,
//! `SameSite=Strict`, and `Secure` when the base URL is HTTPS.

use sqlx::PgPool;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "rabit_session";

/// Session expiry time in seconds (24 hours of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Wrap a session store in a layer with the cookie settings.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &AppConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

/// The `PostgreSQL` session store in the `rabit` schema.
///
/// # Panics
///
/// Panics if the schema name or table name is invalid (should never happen
/// with hardcoded "rabit" and "session" values).
#[must_use]
pub fn postgres_session_store(pool: &PgPool) -> PostgresStore {
    // The session table is created by migration.
    PostgresStore::new(pool.clone())
        .with_schema_name("rabit")
        .expect("valid schema name")
        .with_table_name("session")
        .expect("valid table name")
}

/// An in-process session store.
#[must_use]
pub fn memory_session_store() -> MemoryStore {
    MemoryStore::default()
}
