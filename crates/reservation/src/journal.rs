//! Reservation journal trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Creates a new random entry ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded reservation grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationEntry {
    pub entry_id: EntryId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u64,
    pub created_at: DateTime<Utc>,
}

/// Trait for reservation journal implementations.
///
/// The journal is a pure append/read/delete store owned by the coordinator;
/// it never consults the stock ledger. An entry must only ever be written
/// after the corresponding `reserved` increment has landed.
#[async_trait]
pub trait ReservationJournal: Send + Sync {
    /// Appends an entry recording a grant. Pure append, always succeeds.
    async fn record(&self, order_id: &OrderId, product_id: &ProductId, quantity: u64) -> EntryId;

    /// Returns all live entries for an order; empty when there are none.
    async fn entries_for(&self, order_id: &OrderId) -> Vec<ReservationEntry>;

    /// Deletes all entries for an order, returning how many were removed.
    ///
    /// Idempotent: clearing an order with no entries removes zero.
    async fn clear(&self, order_id: &OrderId) -> usize;

    /// Deletes a single entry by id, returning whether it existed.
    ///
    /// Used by compensation to retract only the entries a failed multi-item
    /// reserve wrote, leaving any earlier grants for the order intact.
    async fn remove(&self, order_id: &OrderId, entry_id: EntryId) -> bool;
}

/// In-memory reservation journal.
#[derive(Clone, Default)]
pub struct InMemoryJournal {
    entries: Arc<RwLock<HashMap<OrderId, Vec<ReservationEntry>>>>,
}

impl InMemoryJournal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of live entries across all orders.
    pub fn entry_count(&self) -> usize {
        self.entries.read().unwrap().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ReservationJournal for InMemoryJournal {
    async fn record(&self, order_id: &OrderId, product_id: &ProductId, quantity: u64) -> EntryId {
        let entry = ReservationEntry {
            entry_id: EntryId::new(),
            order_id: order_id.clone(),
            product_id: product_id.clone(),
            quantity,
            created_at: Utc::now(),
        };
        let entry_id = entry.entry_id;
        self.entries
            .write()
            .unwrap()
            .entry(order_id.clone())
            .or_default()
            .push(entry);
        entry_id
    }

    async fn entries_for(&self, order_id: &OrderId) -> Vec<ReservationEntry> {
        self.entries
            .read()
            .unwrap()
            .get(order_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn clear(&self, order_id: &OrderId) -> usize {
        self.entries
            .write()
            .unwrap()
            .remove(order_id)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    async fn remove(&self, order_id: &OrderId, entry_id: EntryId) -> bool {
        let mut entries = self.entries.write().unwrap();
        let Some(order_entries) = entries.get_mut(order_id) else {
            return false;
        };
        let before = order_entries.len();
        order_entries.retain(|e| e.entry_id != entry_id);
        let removed = order_entries.len() < before;
        if order_entries.is_empty() {
            entries.remove(order_id);
        }
        removed
    }
}
