use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the stock ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    /// No stock record exists for the product.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    /// Available stock does not cover the requested quantity.
    #[error(
        "Insufficient stock for {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u64,
    },
}

/// Result type for stock ledger operations.
pub type Result<T> = std::result::Result<T, StockError>;
