//! Brand routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use rabit_core::models::{Brand, BrandInput};

use crate::error::AppError;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::brands::{create_brand_for_owner, create_own_brand};
use crate::state::AppState;

/// Build the brand router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/brands", post(create_own))
        .route("/api/admin/brands", get(list_all).post(create_for_owner))
}

/// Create a brand owned by the caller.
///
/// POST /api/brands
async fn create_own(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<BrandInput>,
) -> Result<(StatusCode, Json<Brand>), AppError> {
    let brand = create_own_brand(state.store(), &user, input).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

/// Every live brand, newest first.
///
/// GET /api/admin/brands
async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Brand>>, AppError> {
    Ok(Json(state.store().list_brands().await?))
}

/// Create a brand for the owner named on the form.
///
/// POST /api/admin/brands
async fn create_for_owner(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<BrandInput>,
) -> Result<(StatusCode, Json<Brand>), AppError> {
    let brand = create_brand_for_owner(state.store(), input).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}
