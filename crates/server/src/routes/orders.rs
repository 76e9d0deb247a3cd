//! Order list routes.
//!
//! Status changes, field edits and notes all go into the row's draft and
//! reach the store together on save.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;

use rabit_core::models::{Order, OrderChange, OrderInput};
use rabit_core::{BrandId, NoteId, OrderId, OrderStatus};

use crate::error::AppError;
use crate::middleware::BrandContext;
use crate::services::orders::create_order;
use crate::state::AppState;

use super::{DeleteQuery, ListQuery, ResolveForm, ToggleResponse};

/// Build the order router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/brands/{brand}/orders", get(list_orders).post(create))
        .route(
            "/api/brands/{brand}/orders/{order}",
            axum::routing::patch(change).delete(delete),
        )
        .route("/api/brands/{brand}/orders/{order}/status", put(set_status))
        .route("/api/brands/{brand}/orders/{order}/notes", post(add_note))
        .route(
            "/api/brands/{brand}/orders/{order}/notes/{note}/resolved",
            put(set_note_resolved),
        )
        .route("/api/brands/{brand}/orders/{order}/toggle", post(toggle))
        .route("/api/brands/{brand}/orders/{order}/save", post(save))
        .route("/api/brands/{brand}/orders/{order}/resolve", post(resolve))
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct NoteForm {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolvedForm {
    pub resolved: bool,
}

/// GET /api/brands/{brand}/orders
async fn list_orders(
    State(state): State<AppState>,
    ctx: BrandContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::list::<Order>(&state, &ctx, query).await
}

/// POST /api/brands/{brand}/orders
async fn create(
    State(state): State<AppState>,
    ctx: BrandContext,
    Json(input): Json<OrderInput>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = create_order(state.store(), ctx.brand_id(), input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /api/brands/{brand}/orders/{order}/toggle
async fn toggle(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, OrderId)>,
) -> Result<Json<ToggleResponse>, AppError> {
    super::toggle::<Order>(&state, &ctx, id).await
}

/// PATCH /api/brands/{brand}/orders/{order}
async fn change(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, OrderId)>,
    Json(change): Json<OrderChange>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::edit::<Order>(&state, &ctx, move |table| table.field_change(id, change)).await
}

/// PUT /api/brands/{brand}/orders/{order}/status
async fn set_status(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, OrderId)>,
    Json(form): Json<StatusForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::edit::<Order>(&state, &ctx, move |table| table.status_change(id, form.status)).await
}

/// POST /api/brands/{brand}/orders/{order}/notes
async fn add_note(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, OrderId)>,
    Json(form): Json<NoteForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::edit::<Order>(&state, &ctx, move |table| table.add_note(id, &form.content)).await
}

/// PUT /api/brands/{brand}/orders/{order}/notes/{note}/resolved
async fn set_note_resolved(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id, note)): Path<(BrandId, OrderId, NoteId)>,
    Json(form): Json<ResolvedForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::edit::<Order>(&state, &ctx, move |table| {
        table.set_note_resolved(id, note, form.resolved)
    })
    .await
}

/// POST /api/brands/{brand}/orders/{order}/save
async fn save(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, OrderId)>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::save::<Order>(&state, &ctx, id).await
}

/// POST /api/brands/{brand}/orders/{order}/resolve
async fn resolve(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, OrderId)>,
    Json(form): Json<ResolveForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::resolve::<Order>(&state, &ctx, id, form.resolution).await
}

/// DELETE /api/brands/{brand}/orders/{order}?confirm=true
async fn delete(
    State(state): State<AppState>,
    ctx: BrandContext,
    Path((_, id)): Path<(BrandId, OrderId)>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    super::delete::<Order>(&state, &ctx, id, query.confirm).await
}
