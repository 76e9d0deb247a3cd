//! Live list updates over Server-Sent Events.
//!
//! The stream opens with one `orders` and one `products` event carrying the
//! caller's rendered lists, then sends a fresh one whenever the store
//! reports a write to that list.
//!
//! The stream ends when the caller logs out, when the brand is no longer
//! theirs to see, or when the store stops publishing.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    Router,
    extract::State,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use serde::Serialize;

use rabit_core::models::{Order, Product};

use crate::middleware::{BrandContext, can_access};
use crate::services::Listing;
use crate::state::AppState;
use crate::store::Collection;

/// Build the events router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/brands/{brand}/events", get(events))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Orders,
    Products,
    Closed,
}

/// GET /api/brands/{brand}/events
async fn events(
    State(state): State<AppState>,
    ctx: BrandContext,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let hub = state.store().hub();
    let mut orders = hub.subscribe(Collection::Orders(ctx.brand_id()));
    let mut products = hub.subscribe(Collection::Products(ctx.brand_id()));
    let mut closed = state.workspaces().closed();
    tracing::info!(user_id = %ctx.user.id, brand_id = %ctx.brand_id(), "Event stream opened");

    let event_stream = stream! {
        yield Ok(snapshot::<Order>(&state, &ctx, "orders").await);
        yield Ok(snapshot::<Product>(&state, &ctx, "products").await);

        loop {
            // Logouts win over pending list changes.
            let wake = tokio::select! {
                biased;

                gone = closed.recv() => match gone {
                    Ok(user) if user != ctx.user.id => continue,
                    _ => Wake::Closed,
                },
                changed = orders.changed() => changed.map_or(Wake::Closed, |()| Wake::Orders),
                changed = products.changed() => changed.map_or(Wake::Closed, |()| Wake::Products),
            };
            if wake == Wake::Closed || !still_allowed(&state, &ctx).await {
                break;
            }
            yield Ok(match wake {
                Wake::Orders => snapshot::<Order>(&state, &ctx, "orders").await,
                _ => snapshot::<Product>(&state, &ctx, "products").await,
            });
        }
        tracing::info!(user_id = %ctx.user.id, brand_id = %ctx.brand_id(), "Event stream closed");
    };

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

/// Whether the brand still exists and the caller may still see it.
async fn still_allowed(state: &AppState, ctx: &BrandContext) -> bool {
    match state.store().brand_by_id(ctx.brand_id()).await {
        Ok(Some(brand)) => can_access(&ctx.user, &brand),
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to recheck brand access");
            false
        }
    }
}

/// The caller's synced list as an event named `name`.
async fn snapshot<E>(state: &AppState, ctx: &BrandContext, name: &'static str) -> Event
where
    E: Listing + Serialize,
    E::Id: Serialize,
    E::Draft: Serialize,
    E::Facet: std::fmt::Display,
{
    match super::with_list::<E, _, _>(state, ctx, |_| Ok(())).await {
        Ok(((), list)) => Event::default().event(name).data(list.to_string()),
        Err(e) => {
            tracing::warn!(error = %e, list = name, "Failed to build snapshot event");
            Event::default()
                .event("error")
                .data(r#"{"error":"Failed to load the list."}"#)
        }
    }
}
