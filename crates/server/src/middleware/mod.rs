//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, one hub per request)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (tower-sessions, `PostgreSQL` or in-memory store)
//!
//! Authentication is done by extractors in route handlers rather than a
//! blanket guard, so each route states what it needs.

pub mod auth;
pub mod session;

pub use auth::{
    AuthRejection, BrandContext, RequireAdmin, RequireAuth, can_access, clear_current_user,
    set_current_user,
};
pub use session::{
    SESSION_COOKIE_NAME, create_session_layer, memory_session_store, postgres_session_store,
};
