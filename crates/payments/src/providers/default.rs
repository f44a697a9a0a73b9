//! Provider that approves every request.

use async_trait::async_trait;
use domain::{Payment, Purchase};

use crate::error::ProviderError;
use crate::provider::PaymentProvider;

/// Provider behind the built-in `default` payment method.
///
/// Approves every operation without contacting anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPaymentProvider;

impl DefaultPaymentProvider {
    /// The `sys_name` this provider is registered under.
    pub const SYS_NAME: &'static str = "default";
}

#[async_trait]
impl PaymentProvider for DefaultPaymentProvider {
    async fn process_payment(&self, purchase: &Purchase) -> Result<bool, ProviderError> {
        tracing::debug!(
            purchase_id = %purchase.id,
            total = %purchase.total,
            "default provider approved payment"
        );
        Ok(true)
    }

    async fn initiate_payment(&self, purchase: &Purchase) -> Result<bool, ProviderError> {
        tracing::debug!(purchase_id = %purchase.id, "default provider initiated payment");
        Ok(true)
    }

    async fn cancel_payment(&self, payment: &Payment) -> Result<bool, ProviderError> {
        tracing::debug!(payment_id = %payment.id, "default provider cancelled payment");
        Ok(true)
    }

    async fn finalize_payment(&self, payment: &Payment) -> Result<bool, ProviderError> {
        tracing::debug!(payment_id = %payment.id, "default provider finalized payment");
        Ok(true)
    }
}
