//! Stock ledger: per-product quantity/reserved counters.
//!
//! The ledger owns the only shared mutable state in the fulfillment core.
//! Its `try_reserve` check-then-increment is linearizable per product id,
//! so concurrent reservations against the same product can never oversell.

pub mod error;
pub mod ledger;

pub use error::{Result, StockError};
pub use ledger::{InMemoryStockLedger, StockLedger, StockLevels};
