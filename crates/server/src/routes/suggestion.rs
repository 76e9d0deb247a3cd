//! Shipping suggestion route.

use axum::{Json, Router, extract::State, routing::post};

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::services::{ShippingRequest, ShippingSuggestion, suggest_shipping};
use crate::state::AppState;

/// Build the suggestion router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/shipping-suggestion", post(suggest))
}

/// Ask the model which shipping companies fit the order.
///
/// POST /api/shipping-suggestion
async fn suggest(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(request): Json<ShippingRequest>,
) -> Result<Json<ShippingSuggestion>, AppError> {
    Ok(Json(suggest_shipping(state.claude(), &request).await?))
}
