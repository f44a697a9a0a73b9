//! Domain error types.

use thiserror::Error;

/// Errors raised while building domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Two amounts in different currencies were combined.
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: String, found: String },

    /// A purchase was created without products.
    #[error("Purchase has no selected products")]
    NoProducts,

    /// A product was priced below zero.
    #[error("Invalid price for product {product}: {cents} (must not be negative)")]
    InvalidPrice { product: String, cents: i64 },

    /// A sum of amounts does not fit in the cent representation.
    #[error("Amount is too large")]
    AmountOverflow,
}
