//! Authentication extractors.
//!
//! Every identity check happens per request: the session names the user, and
//! [`BrandContext`] resolves the brand from the path and checks that the user
//! may act on it. Nothing is kept in process-wide state.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{FromRequestParts, Path},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use rabit_core::BrandId;
use rabit_core::models::Brand;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection for the auth extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No user in the session.
    Unauthorized,
    /// Logged in, but not allowed here.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Please log in."),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have access to this resource.",
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<AuthRejection> for AppError {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::Unauthorized => Self::Unauthorized("Please log in.".to_string()),
            AuthRejection::Forbidden => {
                Self::Forbidden("You do not have access to this resource.".to_string())
            }
        }
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    // Set by SessionManagerLayer
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

/// Extractor that requires the admin role.
///
/// Not logged in is 401; logged in without the role is 403.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Admin route refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// The user and brand a brand-scoped request acts on.
///
/// Reads the `{brand}` path segment, loads the live brand, and admits the
/// brand's owner or any admin.
#[derive(Debug, Clone)]
pub struct BrandContext {
    pub user: CurrentUser,
    pub brand: Brand,
}

impl BrandContext {
    #[must_use]
    pub const fn brand_id(&self) -> BrandId {
        self.brand.id
    }
}

/// Whether `user` may act on `brand`.
#[must_use]
pub fn can_access(user: &CurrentUser, brand: &Brand) -> bool {
    user.is_admin() || brand.owner == user.id
}

impl FromRequestParts<AppState> for BrandContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;

        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let brand_id: BrandId = params
            .get("brand")
            .ok_or_else(|| AppError::BadRequest("missing brand".to_string()))?
            .parse()
            .map_err(|_| AppError::BadRequest("invalid brand id".to_string()))?;

        let brand = state
            .store()
            .brand_by_id(brand_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("brand {brand_id}")))?;

        if !can_access(&user, &brand) {
            tracing::warn!(user_id = %user.id, brand_id = %brand.id, "Brand access refused");
            return Err(AuthRejection::Forbidden.into());
        }

        Ok(Self { user, brand })
    }
}

/// Store the logged-in user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop the session entirely.
///
/// # Errors
///
/// Returns an error if the session cannot be cleared.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
