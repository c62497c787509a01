//! Shared application state.

use reservation::{ReservationCoordinator, ReservationJournal};
use stock_ledger::StockLedger;

use crate::auth::TokenVerifier;
use crate::invoice::InvoiceGenerator;
use crate::proxy::UpstreamClient;

/// Shared application state accessible from all handlers.
///
/// Generic over its collaborators so tests can substitute in-memory
/// implementations without touching the router.
pub struct AppState<L, J, V, G>
where
    L: StockLedger,
    J: ReservationJournal,
    V: TokenVerifier,
    G: InvoiceGenerator,
{
    /// Direct handle for stock read/upsert routes.
    pub ledger: L,
    /// Reservation engine behind the reserve/release routes.
    pub coordinator: ReservationCoordinator<L, J>,
    /// Delegated bearer-token verifier.
    pub verifier: V,
    /// Bridge to the invoice compute collaborator.
    pub invoices: G,
    /// Auth collaborator, for the unauthenticated passthrough routes.
    pub auth_upstream: UpstreamClient,
    /// Order store collaborator.
    pub orders_upstream: UpstreamClient,
}
