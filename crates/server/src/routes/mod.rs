//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                   - Liveness
//! GET    /health/ready                             - Store reachable
//!
//! # Auth
//! POST   /auth/login                               - Email and password login
//! POST   /auth/logout                              - Clear the session
//! GET    /api/me                                   - User, brand and admin flag
//!
//! # Brands
//! POST   /api/brands                               - Create own brand
//! GET    /api/admin/brands                         - All live brands (admin)
//! POST   /api/admin/brands                         - Create a brand for an owner (admin)
//!
//! # Products (per brand)
//! GET    /api/brands/{brand}/products              - List view (?filter=Active)
//! POST   /api/brands/{brand}/products              - Create
//! PATCH  /api/brands/{brand}/products/{id}         - Edit a field of the draft
//! POST   /api/brands/{brand}/products/{id}/toggle  - Open or close the row
//! POST   /api/brands/{brand}/products/{id}/save    - Save the draft
//! POST   /api/brands/{brand}/products/{id}/resolve - Settle a conflict
//! DELETE /api/brands/{brand}/products/{id}         - Delete (?confirm=true)
//!
//! # Orders (per brand)
//! GET    /api/brands/{brand}/orders                - List view (?filter=Shipped)
//! POST   /api/brands/{brand}/orders                - Create
//! PATCH  /api/brands/{brand}/orders/{id}           - Edit a field of the draft
//! PUT    /api/brands/{brand}/orders/{id}/status    - Change status in the draft
//! POST   /api/brands/{brand}/orders/{id}/notes     - Add a note to the draft
//! PUT    /api/brands/{brand}/orders/{id}/notes/{note}/resolved
//! POST   /api/brands/{brand}/orders/{id}/toggle    - Open or close the row
//! POST   /api/brands/{brand}/orders/{id}/save      - Save the draft with its notes
//! POST   /api/brands/{brand}/orders/{id}/resolve   - Settle a conflict
//! DELETE /api/brands/{brand}/orders/{id}           - Delete (?confirm=true)
//!
//! # Live updates
//! GET    /api/brands/{brand}/events                - SSE list snapshots
//!
//! # AI
//! POST   /api/shipping-suggestion                  - Suggest shipping companies
//! ```

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use rabit_core::view::{ConflictResolution, Filter, TableError, TableState};

use crate::error::AppError;
use crate::middleware::BrandContext;
use crate::services::Listing;
use crate::services::workspace::render;
use crate::state::AppState;

pub mod auth;
pub mod brands;
pub mod events;
pub mod orders;
pub mod products;
pub mod suggestion;

/// Build the full router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth::router())
        .merge(brands::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(events::router())
        .merge(suggestion::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

// =============================================================================
// Shared list handling
// =============================================================================

/// `?filter=` on list routes.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
}

/// `?confirm=` on delete routes.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// Body of the resolve routes.
#[derive(Debug, Deserialize)]
pub struct ResolveForm {
    pub resolution: ConflictResolution,
}

/// Response of the toggle routes.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub expanded: bool,
    pub list: serde_json::Value,
}

fn render_list<E>(table: &TableState<E>) -> Result<serde_json::Value, AppError>
where
    E: Listing + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display,
{
    render(table).map_err(|e| AppError::Internal(format!("Failed to render list: {e}")))
}

/// Run `op` on the caller's synced list and return the list afterwards.
async fn with_list<E, F, T>(
    state: &AppState,
    ctx: &BrandContext,
    op: F,
) -> Result<(T, serde_json::Value), AppError>
where
    E: Listing + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display,
    F: FnOnce(&mut TableState<E>) -> Result<T, AppError> + Send,
{
    let workspace = state
        .workspaces()
        .open(ctx.user.id, ctx.brand_id())
        .await;
    let mut workspace = workspace.lock().await;
    let table = workspace.sync::<E>(state.store()).await?;
    let out = op(table)?;
    Ok((out, render_list(table)?))
}

/// The caller's list, optionally switching its filter first.
async fn list<E>(
    state: &AppState,
    ctx: &BrandContext,
    query: ListQuery,
) -> Result<Json<serde_json::Value>, AppError>
where
    E: Listing + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display + std::str::FromStr,
{
    let filter: Option<Filter<E::Facet>> = query
        .filter
        .map(|raw| {
            raw.parse()
                .map_err(|_| AppError::BadRequest(format!("unknown filter: {raw}")))
        })
        .transpose()?;

    let ((), list) = with_list::<E, _, _>(state, ctx, |table| {
        if let Some(filter) = filter {
            table.set_filter(filter);
        }
        Ok(())
    })
    .await?;
    Ok(Json(list))
}

async fn toggle<E>(
    state: &AppState,
    ctx: &BrandContext,
    id: E::Id,
) -> Result<Json<ToggleResponse>, AppError>
where
    E: Listing + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display,
{
    let (expanded, list) =
        with_list::<E, _, _>(state, ctx, |table| Ok(table.toggle_expand(id)?)).await?;
    Ok(Json(ToggleResponse { expanded, list }))
}

async fn edit<E>(
    state: &AppState,
    ctx: &BrandContext,
    op: impl FnOnce(&mut TableState<E>) -> Result<(), TableError> + Send,
) -> Result<Json<serde_json::Value>, AppError>
where
    E: Listing + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display,
{
    let ((), list) = with_list::<E, _, _>(state, ctx, |table| Ok(op(table)?)).await?;
    Ok(Json(list))
}

async fn resolve<E>(
    state: &AppState,
    ctx: &BrandContext,
    id: E::Id,
    resolution: ConflictResolution,
) -> Result<Json<serde_json::Value>, AppError>
where
    E: Listing + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display,
{
    tracing::info!(%id, ?resolution, "Resolving conflict");
    edit::<E>(state, ctx, move |table| {
        table.resolve_conflict(id, resolution).map(|_| ())
    })
    .await
}

/// Save the row's draft and return the refreshed list.
async fn save<E>(
    state: &AppState,
    ctx: &BrandContext,
    id: E::Id,
) -> Result<Json<serde_json::Value>, AppError>
where
    E: Listing + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display,
{
    let workspace = state
        .workspaces()
        .open(ctx.user.id, ctx.brand_id())
        .await;
    let mut workspace = workspace.lock().await;
    workspace.save::<E>(state.store(), id).await?;
    let table = workspace.sync::<E>(state.store()).await?;
    Ok(Json(render_list(table)?))
}

/// Delete the row and return the refreshed list.
async fn delete<E>(
    state: &AppState,
    ctx: &BrandContext,
    id: E::Id,
    confirmed: bool,
) -> Result<Json<serde_json::Value>, AppError>
where
    E: Listing + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display,
{
    let workspace = state
        .workspaces()
        .open(ctx.user.id, ctx.brand_id())
        .await;
    let mut workspace = workspace.lock().await;
    workspace.delete::<E>(state.store(), id, confirmed).await?;
    let table = workspace.sync::<E>(state.store()).await?;
    Ok(Json(render_list(table)?))
}
