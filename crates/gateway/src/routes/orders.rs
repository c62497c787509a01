//! Authenticated forwarding to the order store collaborator.
//!
//! The authenticated user id is injected where the order contract requires
//! it: as a query parameter on listing and into the body on creation. Get
//! and update forward as-is; upstream statuses are relayed verbatim.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use reservation::ReservationJournal;
use stock_ledger::StockLedger;

use crate::auth::{AuthenticatedUser, TokenVerifier};
use crate::error::GatewayError;
use crate::invoice::InvoiceGenerator;
use crate::proxy::UpstreamResponse;
use crate::routes::json_or_empty;
use crate::state::AppState;

/// GET /api/orders — list the caller's orders.
#[tracing::instrument(skip(state, params))]
pub async fn list<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(mut params): Query<HashMap<String, String>>,
) -> Result<UpstreamResponse, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    params.insert("user_id".to_string(), user_id.to_string());
    state.orders_upstream.get("/orders", &params).await
}

/// POST /api/orders — create an order for the caller.
#[tracing::instrument(skip(state, body))]
pub async fn create<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    body: Option<Json<serde_json::Value>>,
) -> Result<UpstreamResponse, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    let mut body = json_or_empty(body);
    match body.as_object_mut() {
        Some(map) => {
            map.insert("user_id".to_string(), serde_json::json!(user_id.get()));
        }
        None => {
            return Err(GatewayError::BadRequest(
                "Order body must be a JSON object".to_string(),
            ));
        }
    }
    state.orders_upstream.post_json("/orders", &body).await
}

/// GET /api/orders/{id} — fetch a single order.
#[tracing::instrument(skip(state))]
pub async fn get<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(_user_id): AuthenticatedUser,
    Path(order_id): Path<String>,
) -> Result<UpstreamResponse, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    state
        .orders_upstream
        .get(&format!("/orders/{order_id}"), &HashMap::new())
        .await
}

/// PATCH /api/orders/{id} — update an order's status.
#[tracing::instrument(skip(state, body))]
pub async fn update<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(_user_id): AuthenticatedUser,
    Path(order_id): Path<String>,
    body: Option<Json<serde_json::Value>>,
) -> Result<UpstreamResponse, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    state
        .orders_upstream
        .patch_json(&format!("/orders/{order_id}"), &json_or_empty(body))
        .await
}
