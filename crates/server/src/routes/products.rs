//! Product list routes.
//!
//! Edits stay in the caller's workspace until saved; every route answers
//! with the rendered list.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use rabit_core::models::{Product, ProductChange, ProductInput};
use rabit_core::{BrandId, ProductId};

use crate::error::AppError;
use crate::middleware::BrandContext;
use crate::services::products::create_product;
use crate::state::AppState;

use super::{DeleteQuery, ListQuery, ResolveForm, ToggleResponse};

/// Build the product router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/brands/{brand}/products",
            get(list_products).post(create),
        )
        .route(
            "/api/brands/{brand}/products/{product}",
            axum::routing::patch(change).delete(delete),
        )
        .route("/api/brands/{brand}/products/{product}/toggle", post(toggle))
        .route("/api/brands/{brand}/products/{product}/save", post(save))
        .route("/api/brands/{brand}/products/{product}/resolve", post(resolve))
}

/// GET /api/brands/{brand}/products
async fn list_products(
    State(state): State<AppState>,
    ctx: BrandContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::list::<Product>(&state, &ctx, query).await
}

/// POST /api/brands/{brand}/products
async fn create(
    State(state): State<AppState>,
    ctx: BrandContext,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = create_product(state.store(), ctx.brand_id(), input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// POST /api/brands/{brand}/products/{product}/toggle
async fn toggle(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, ProductId)>,
) -> Result<Json<ToggleResponse>, AppError> {
    super::toggle::<Product>(&state, &ctx, id).await
}

/// PATCH /api/brands/{brand}/products/{product}
async fn change(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, ProductId)>,
    Json(change): Json<ProductChange>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::edit::<Product>(&state, &ctx, move |table| table.field_change(id, change)).await
}

/// POST /api/brands/{brand}/products/{product}/save
async fn save(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, ProductId)>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::save::<Product>(&state, &ctx, id).await
}

/// POST /api/brands/{brand}/products/{product}/resolve
async fn resolve(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, ProductId)>,
    Json(form): Json<ResolveForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::resolve::<Product>(&state, &ctx, id, form.resolution).await
}

/// DELETE /api/brands/{brand}/products/{product}?confirm=true
///
/// Products are soft-deleted; they disappear from every list.
async fn delete(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, ProductId)>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::delete::<Product>(&state, &ctx, id, query.confirm).await
}
