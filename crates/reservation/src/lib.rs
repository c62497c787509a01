//! Reservation journal and coordinator.
//!
//! The journal records one entry per (order, product, quantity) grant; the
//! coordinator drives multi-item reserves against the stock ledger with
//! compensation-based rollback, since no transaction spans products.

pub mod coordinator;
pub mod error;
pub mod journal;

pub use coordinator::{ReleaseOutcome, ReservationCoordinator};
pub use error::ReservationError;
pub use journal::{EntryId, InMemoryJournal, ReservationEntry, ReservationJournal};
