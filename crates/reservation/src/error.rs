use common::ProductId;
use stock_ledger::StockError;
use thiserror::Error;

/// Errors that can occur during reservation operations.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// The stock ledger rejected a single-item reservation.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// A multi-item reservation failed on one item; every grant made by the
    /// same call has been compensated.
    #[error("Reservation rejected for {product_id}: {reason}")]
    ItemRejected {
        product_id: ProductId,
        #[source]
        reason: StockError,
    },
}

impl ReservationError {
    /// The underlying stock rejection, regardless of variant.
    pub fn stock_cause(&self) -> &StockError {
        match self {
            ReservationError::Stock(err) => err,
            ReservationError::ItemRejected { reason, .. } => reason,
        }
    }
}
