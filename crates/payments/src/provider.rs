//! Payment provider capability.

use async_trait::async_trait;
use domain::{Payment, Purchase};

use crate::error::ProviderError;

/// An external payment processor.
///
/// Every operation answers `Ok(true)` when the provider accepted it and
/// `Ok(false)` when it declined; `Err` means the call itself failed.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Charges the purchase synchronously.
    async fn process_payment(&self, purchase: &Purchase) -> Result<bool, ProviderError>;

    /// Starts an asynchronous charge confirmed later through a webhook.
    async fn initiate_payment(&self, purchase: &Purchase) -> Result<bool, ProviderError>;

    /// Cancels a payment that was initiated but not settled.
    async fn cancel_payment(&self, payment: &Payment) -> Result<bool, ProviderError>;

    /// Confirms a payment that was initiated but not settled.
    async fn finalize_payment(&self, payment: &Payment) -> Result<bool, ProviderError>;
}
