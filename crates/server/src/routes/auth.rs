//! Authentication route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::AuthService;
use crate::services::brands::{Profile, profile};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/api/me", get(me))
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Log in with email and password.
///
/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<Profile>, AppError> {
    let user = AuthService::new(state.store())
        .login_with_password(&form.email, &form.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login refused"))?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store session: {e}")))?;
    set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "Logged in");

    Ok(Json(profile(state.store(), current).await?))
}

/// Logout and clear session.
///
/// POST /auth/logout
async fn logout(State(state): State<AppState>, session: Session) -> StatusCode {
    if let Ok(Some(user)) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
    {
        state.workspaces().close_all(user.id).await;
    }
    if let Err(e) = clear_current_user(&session).await {
        tracing::warn!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();
    StatusCode::NO_CONTENT
}

/// The signed-in user, their brand and the admin flag.
///
/// GET /api/me
async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(profile(state.store(), user).await?))
}
