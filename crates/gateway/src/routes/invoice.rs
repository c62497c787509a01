//! Invoice generation bridge.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use reservation::ReservationJournal;
use stock_ledger::StockLedger;

use crate::auth::{AuthenticatedUser, TokenVerifier};
use crate::error::GatewayError;
use crate::invoice::{Invoice, InvoiceGenerator};
use crate::state::AppState;

/// POST /api/orders/{order_id}/invoice — generate an invoice document.
///
/// Blocks for the compute collaborator's result up to its bounded deadline;
/// a failure status encoded in the result envelope is propagated.
#[tracing::instrument(skip(state))]
pub async fn create<L, J, V, G>(
    State(state): State<Arc<AppState<L, J, V, G>>>,
    AuthenticatedUser(_user_id): AuthenticatedUser,
    Path(order_id): Path<String>,
) -> Result<Json<Invoice>, GatewayError>
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    let invoice = state.invoices.generate(&OrderId::new(order_id)).await?;
    Ok(Json(invoice))
}
