//! Stock ledger trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StockError};

/// Quantity counters for a single product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    /// Total quantity on hand.
    pub quantity: u64,
    /// Amount currently earmarked by reservations.
    pub reserved: u64,
}

impl StockLevels {
    /// Creates levels with the given total quantity and nothing reserved.
    pub fn with_quantity(quantity: u64) -> Self {
        Self {
            quantity,
            reserved: 0,
        }
    }

    /// Quantity still available for reservation.
    ///
    /// Saturates at zero: an `upsert` may lower `quantity` below an
    /// already-reserved amount, and reads must not underflow.
    pub fn available(&self) -> u64 {
        self.quantity.saturating_sub(self.reserved)
    }
}

/// Core trait for stock ledger implementations.
///
/// `try_reserve`/`restore` must be linearizable per product id: no
/// interleaving of two `try_reserve` calls on the same product may grant
/// quantities whose sum exceeds the availability either observed.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Creates or overwrites the total quantity for a product.
    ///
    /// The `reserved` counter is untouched. Returns the resulting levels.
    async fn upsert(&self, product_id: &ProductId, quantity: u64) -> Result<StockLevels>;

    /// Atomically checks availability and increments `reserved`.
    ///
    /// Fails with `InsufficientStock` (without mutating) when
    /// `available < quantity`, or `UnknownProduct` when no record exists.
    async fn try_reserve(&self, product_id: &ProductId, quantity: u64) -> Result<()>;

    /// Decrements `reserved`, flooring at zero.
    ///
    /// The floor makes double-release harmless: `reserved` never goes
    /// negative regardless of the input sequence.
    async fn restore(&self, product_id: &ProductId, quantity: u64) -> Result<()>;

    /// Returns the current levels for a product.
    async fn availability(&self, product_id: &ProductId) -> Result<StockLevels>;

    /// Returns the levels of every known product, ordered by product id.
    async fn list(&self) -> Result<Vec<(ProductId, StockLevels)>>;
}

/// In-memory stock ledger.
///
/// Each product gets its own mutex so the `try_reserve` critical section is
/// scoped per product id; the outer map lock is held only long enough to
/// locate or insert a slot. No lock is ever held across an await point.
#[derive(Clone, Default)]
pub struct InMemoryStockLedger {
    slots: Arc<RwLock<HashMap<ProductId, Arc<Mutex<StockLevels>>>>>,
}

impl InMemoryStockLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of known products.
    pub fn product_count(&self) -> usize {
        self.slots.read().unwrap().len()
    }

    fn slot(&self, product_id: &ProductId) -> Result<Arc<Mutex<StockLevels>>> {
        self.slots
            .read()
            .unwrap()
            .get(product_id)
            .cloned()
            .ok_or_else(|| StockError::UnknownProduct(product_id.clone()))
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn upsert(&self, product_id: &ProductId, quantity: u64) -> Result<StockLevels> {
        let slot = {
            let mut slots = self.slots.write().unwrap();
            slots
                .entry(product_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(StockLevels::default())))
                .clone()
        };
        let mut levels = slot.lock().unwrap();
        levels.quantity = quantity;
        tracing::debug!(%product_id, quantity, reserved = levels.reserved, "stock upserted");
        Ok(*levels)
    }

    async fn try_reserve(&self, product_id: &ProductId, quantity: u64) -> Result<()> {
        let slot = self.slot(product_id)?;
        let mut levels = slot.lock().unwrap();
        let available = levels.available();
        if quantity > available {
            metrics::counter!("stock_reservations_rejected_total").increment(1);
            return Err(StockError::InsufficientStock {
                product_id: product_id.clone(),
                requested: quantity,
                available,
            });
        }
        levels.reserved += quantity;
        metrics::counter!("stock_reservations_granted_total").increment(1);
        Ok(())
    }

    async fn restore(&self, product_id: &ProductId, quantity: u64) -> Result<()> {
        let slot = self.slot(product_id)?;
        let mut levels = slot.lock().unwrap();
        levels.reserved = levels.reserved.saturating_sub(quantity);
        Ok(())
    }

    async fn availability(&self, product_id: &ProductId) -> Result<StockLevels> {
        let slot = self.slot(product_id)?;
        let levels = slot.lock().unwrap();
        Ok(*levels)
    }

    async fn list(&self) -> Result<Vec<(ProductId, StockLevels)>> {
        let slots: Vec<(ProductId, Arc<Mutex<StockLevels>>)> = {
            let map = self.slots.read().unwrap();
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        let mut all: Vec<(ProductId, StockLevels)> = slots
            .into_iter()
            .map(|(id, slot)| {
                let levels = *slot.lock().unwrap();
                (id, levels)
            })
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(all)
    }
}
