//! Reserve and release endpoints backed by the reservation coordinator.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{OrderId, ProductId};
use reservation::ReservationJournal;
use serde::{Deserialize, Serialize};
use stock_ledger::StockLedger;

use crate::auth::{AuthenticatedUser, TokenVerifier};
use crate::error::GatewayError;
use crate::invoice::InvoiceGenerator;
use crate::routes::json_or_empty;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct ReserveRequest {
    pub order_id: String,
    pub product_id: String,
    pub quantity: u64,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReserveResponse {
    pub entry_id: String,
}

#[derive(Serialize)]
pub struct ReleaseResponse {
    pub released_entries: usize,
    pub restored_quantity: u64,
}

// -- Handlers --

/// POST /api/reserve — place a hold on stock for an order.
///
/// Availability failures are business outcomes: 404 for an unknown product,
/// 409 when stock does not cover the request. Never retried here.
#[tracing::instrument(skip(state, req))]
pub async fn reserve<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(_user_id): AuthenticatedUser,
    Json(req): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<ReserveResponse>), GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    if req.quantity == 0 {
        return Err(GatewayError::BadRequest(
            "quantity must be positive".to_string(),
        ));
    }

    let order_id = OrderId::new(req.order_id);
    let product_id = ProductId::new(req.product_id);
    let entry_id = state
        .coordinator
        .reserve_one(&order_id, &product_id, req.quantity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReserveResponse {
            entry_id: entry_id.to_string(),
        }),
    ))
}

/// POST /api/release — hand back every hold an order has.
///
/// Idempotent: releasing an order twice, or one with no reservations,
/// succeeds and restores nothing the second time.
#[tracing::instrument(skip(state, body))]
pub async fn release<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(_user_id): AuthenticatedUser,
    body: Option<Json<serde_json::Value>>,
) -> Result<Json<ReleaseResponse>, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    let body = json_or_empty(body);
    let order_id = body
        .get("order_id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::BadRequest("order_id required".to_string()))?;

    let outcome = state
        .coordinator
        .release_order(&OrderId::new(order_id))
        .await;

    Ok(Json(ReleaseResponse {
        released_entries: outcome.released_entries,
        restored_quantity: outcome.restored_quantity,
    }))
}
