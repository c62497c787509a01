//! Reservation coordinator orchestrating multi-item reserves.

use common::{OrderId, ProductId};
use stock_ledger::StockLedger;

use crate::error::ReservationError;
use crate::journal::{EntryId, ReservationJournal};

/// Result of releasing an order's reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// Number of journal entries released.
    pub released_entries: usize,
    /// Total quantity handed back to the ledger.
    pub restored_quantity: u64,
}

/// Orchestrates reservations against the stock ledger and the journal.
///
/// Multi-item reserves are all-or-nothing by compensation: per-product
/// locking is per item, no transaction spans products, so on the first
/// rejection every grant already made by the call is restored and its
/// journal entry retracted.
pub struct ReservationCoordinator<L, J>
where
    L: StockLedger,
    J: ReservationJournal,
{
    ledger: L,
    journal: J,
}

impl<L, J> ReservationCoordinator<L, J>
where
    L: StockLedger,
    J: ReservationJournal,
{
    /// Creates a new coordinator over a ledger and a journal.
    pub fn new(ledger: L, journal: J) -> Self {
        Self { ledger, journal }
    }

    /// Reserves a single item for an order.
    ///
    /// The journal entry is written strictly after the ledger grants, so an
    /// entry never exists without its `reserved` increment. Rejections leave
    /// the journal untouched.
    #[tracing::instrument(skip(self))]
    pub async fn reserve_one(
        &self,
        order_id: &OrderId,
        product_id: &ProductId,
        quantity: u64,
    ) -> Result<EntryId, ReservationError> {
        self.ledger.try_reserve(product_id, quantity).await?;
        let entry_id = self.journal.record(order_id, product_id, quantity).await;
        tracing::debug!(%order_id, %product_id, quantity, %entry_id, "reservation granted");
        Ok(entry_id)
    }

    /// Reserves every item for an order, or none of them.
    ///
    /// Items are taken in ascending product-id order so concurrent orders
    /// touching the same products contend in a consistent sequence. On the
    /// first rejection, every grant made by this call is compensated and the
    /// failed item is named in the error. Availability is reported, not
    /// retried: it may have changed by the time the caller tries again.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn reserve_all(
        &self,
        order_id: &OrderId,
        items: &[(ProductId, u64)],
    ) -> Result<Vec<EntryId>, ReservationError> {
        let mut sorted: Vec<(ProductId, u64)> = items.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut granted: Vec<(ProductId, u64, EntryId)> = Vec::new();
        for (product_id, quantity) in &sorted {
            match self.ledger.try_reserve(product_id, *quantity).await {
                Ok(()) => {
                    let entry_id = self.journal.record(order_id, product_id, *quantity).await;
                    granted.push((product_id.clone(), *quantity, entry_id));
                }
                Err(reason) => {
                    tracing::info!(
                        %order_id, %product_id, quantity, %reason,
                        "multi-item reserve rejected, compensating"
                    );
                    self.compensate(order_id, &granted).await;
                    metrics::counter!("reservations_compensated_total").increment(1);
                    return Err(ReservationError::ItemRejected {
                        product_id: product_id.clone(),
                        reason,
                    });
                }
            }
        }

        metrics::counter!("reservations_granted_total").increment(1);
        Ok(granted.into_iter().map(|(_, _, id)| id).collect())
    }

    /// Releases every reservation held by an order.
    ///
    /// Idempotent: an order with no journal entries releases nothing. A
    /// restore that does not land is a divergence between ledger and journal
    /// and is escalated for manual reconciliation rather than surfaced as a
    /// caller failure.
    #[tracing::instrument(skip(self))]
    pub async fn release_order(&self, order_id: &OrderId) -> ReleaseOutcome {
        let entries = self.journal.entries_for(order_id).await;
        let mut restored_quantity = 0u64;

        for entry in &entries {
            match self.ledger.restore(&entry.product_id, entry.quantity).await {
                Ok(()) => restored_quantity += entry.quantity,
                Err(err) => {
                    metrics::counter!("compensation_failures_total").increment(1);
                    tracing::error!(
                        %order_id,
                        product_id = %entry.product_id,
                        quantity = entry.quantity,
                        error = %err,
                        "restore failed during release; ledger and journal have diverged"
                    );
                }
            }
        }

        let released_entries = self.journal.clear(order_id).await;
        if released_entries > 0 {
            tracing::info!(%order_id, released_entries, restored_quantity, "order released");
        }

        ReleaseOutcome {
            released_entries,
            restored_quantity,
        }
    }

    /// Unwinds the grants of a failed multi-item reserve, newest first.
    async fn compensate(&self, order_id: &OrderId, granted: &[(ProductId, u64, EntryId)]) {
        for (product_id, quantity, entry_id) in granted.iter().rev() {
            if let Err(err) = self.ledger.restore(product_id, *quantity).await {
                metrics::counter!("compensation_failures_total").increment(1);
                tracing::error!(
                    %order_id, %product_id, quantity, error = %err,
                    "restore failed during compensation; ledger and journal have diverged"
                );
            }
            self.journal.remove(order_id, *entry_id).await;
        }
    }
}
