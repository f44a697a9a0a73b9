//! Payment lifecycle error types.

use store::StoreError;
use thiserror::Error;

/// A precondition of a lifecycle operation that did not hold.
///
/// Checks run in a fixed order and the first failing one is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No purchase with the requested id.
    #[error("Purchase not found.")]
    PurchaseNotFound,

    /// The purchase already carries a payment that is not cancelled.
    #[error("Purchase has already been paid.")]
    PurchaseAlreadyPaid,

    /// The purchase total is zero or negative.
    #[error("Purchase value cannot be zero or negative")]
    NonPositiveValue,

    /// The purchase is not in `creating` status.
    #[error("Purchase is not valid for payment.")]
    PurchaseNotPayable,

    /// No payment method with the requested id.
    #[error("Payment method not found.")]
    PaymentMethodNotFound,

    /// The payment method exists but is disabled.
    #[error("Payment method is inactive.")]
    PaymentMethodInactive,

    /// No provider is registered for the method's `sys_name`.
    #[error("No payment provider registered for '{0}'.")]
    UnknownProvider(String),

    /// No payment with the requested id.
    #[error("Payment not found.")]
    PaymentNotFound,

    /// The payment is already settled.
    #[error("Payment has already been paid.")]
    PaymentAlreadyPaid,

    /// The payment is neither pending nor processing.
    #[error("Payment is not awaiting confirmation.")]
    PaymentNotOpen,

    /// The payment is not linked to a purchase.
    #[error("Payment has no associated purchase.")]
    PaymentWithoutPurchase,
}

/// Why a payment provider call did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider could not be reached.
    #[error("Provider transport failure: {0}")]
    Transport(String),

    /// The provider did not answer in time.
    #[error("Provider timed out")]
    Timeout,

    /// The provider refused the request as malformed.
    #[error("Provider rejected the request: {0}")]
    Rejected(String),
}

/// Errors returned by [`PaymentService`](crate::PaymentService) operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// A precondition failed; nothing was called or persisted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The provider declined or failed to process/initiate the payment.
    #[error("Failed to process payment.")]
    ProcessingFailed,

    /// The provider declined or failed to cancel the payment.
    #[error("Failed to cancel payment.")]
    CancellationFailed,

    /// The provider declined or failed to finalize the payment.
    #[error("Failed to finalize payment.")]
    FinalizationFailed,

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, PaymentError>;
