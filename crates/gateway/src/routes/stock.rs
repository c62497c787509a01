//! Stock listing and upload endpoints backed by the ledger.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use reservation::ReservationJournal;
use serde::{Deserialize, Serialize};
use stock_ledger::{StockLedger, StockLevels};

use crate::auth::{AuthenticatedUser, TokenVerifier};
use crate::error::GatewayError;
use crate::invoice::InvoiceGenerator;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct StockRequest {
    pub product_id: String,
    pub quantity: u64,
}

// -- Response types --

#[derive(Serialize)]
pub struct StockResponse {
    pub product_id: String,
    pub quantity: u64,
    pub reserved: u64,
    pub available: u64,
}

impl StockResponse {
    fn new(product_id: &ProductId, levels: StockLevels) -> Self {
        Self {
            product_id: product_id.to_string(),
            quantity: levels.quantity,
            reserved: levels.reserved,
            available: levels.available(),
        }
    }
}

// -- Handlers --

/// GET /api/stock — list every known product's levels.
#[tracing::instrument(skip(state))]
pub async fn list<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(_user_id): AuthenticatedUser,
) -> Result<Json<Vec<StockResponse>>, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    let all = state.ledger.list().await?;
    let responses = all
        .iter()
        .map(|(product_id, levels)| StockResponse::new(product_id, *levels))
        .collect();
    Ok(Json(responses))
}

/// GET /api/stock/{product_id} — read one product's availability.
#[tracing::instrument(skip(state))]
pub async fn get<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(_user_id): AuthenticatedUser,
    Path(product_id): Path<String>,
) -> Result<Json<StockResponse>, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    let product_id = ProductId::new(product_id);
    let levels = state.ledger.availability(&product_id).await?;
    Ok(Json(StockResponse::new(&product_id, levels)))
}

/// POST /api/stock — create or overwrite a product's total quantity.
#[tracing::instrument(skip(state, req))]
pub async fn create<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(_user_id): AuthenticatedUser,
    Json(req): Json<StockRequest>,
) -> Result<(StatusCode, Json<StockResponse>), GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    let product_id = ProductId::new(req.product_id);
    let levels = state.ledger.upsert(&product_id, req.quantity).await?;
    Ok((
        StatusCode::CREATED,
        Json(StockResponse::new(&product_id, levels)),
    ))
}
