//! Unauthenticated pass-through to the auth collaborator.
//!
//! Register, login, and refresh carry user credentials the gateway must not
//! inspect; requests and responses are relayed verbatim.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use reservation::ReservationJournal;
use stock_ledger::StockLedger;

use crate::auth::TokenVerifier;
use crate::error::GatewayError;
use crate::invoice::InvoiceGenerator;
use crate::proxy::UpstreamResponse;
use crate::routes::json_or_empty;
use crate::state::AppState;

/// POST /api/auth/register — forward a registration request.
pub async fn register<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    body: Option<Json<serde_json::Value>>,
) -> Result<UpstreamResponse, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    state
        .auth_upstream
        .post_json("/register", &json_or_empty(body))
        .await
}

/// POST /api/auth/login — forward a login request.
pub async fn login<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    body: Option<Json<serde_json::Value>>,
) -> Result<UpstreamResponse, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    state
        .auth_upstream
        .post_json("/login", &json_or_empty(body))
        .await
}

/// POST /api/auth/refresh — forward a token refresh request.
pub async fn refresh<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    body: Option<Json<serde_json::Value>>,
) -> Result<UpstreamResponse, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    state
        .auth_upstream
        .post_json("/refresh", &json_or_empty(body))
        .await
}
