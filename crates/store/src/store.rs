use async_trait::async_trait;
use common::{PaymentId, PaymentMethodId, PurchaseId};
use domain::{
    NewPayment, NewPaymentMethod, NewPurchase, Payment, PaymentAggregate, PaymentMethod, Purchase,
    PurchaseAggregate,
};

use crate::Result;

/// Read access to purchases.
#[async_trait]
pub trait PurchaseQuery: Send + Sync {
    /// Loads a purchase together with its latest payment.
    ///
    /// Returns None if the purchase doesn't exist.
    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<PurchaseAggregate>>;
}

/// Write access to purchases.
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Persists a new purchase in `Creating` status at the first version.
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase>;

    /// Writes the purchase back, linking it to `payment` when given.
    ///
    /// Fails with `ConcurrencyConflict` if the stored version differs from
    /// `purchase.version`. Returns the purchase at its new version.
    async fn update_purchase(
        &self,
        purchase: &Purchase,
        payment: Option<&Payment>,
    ) -> Result<Purchase>;
}

/// Read access to payment methods.
#[async_trait]
pub trait PaymentMethodQuery: Send + Sync {
    /// Loads a payment method. Returns None if it doesn't exist.
    async fn get_payment_method(&self, id: PaymentMethodId) -> Result<Option<PaymentMethod>>;

    /// Lists every payment method, ordered by id.
    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>>;
}

/// Write access to payment methods.
#[async_trait]
pub trait PaymentMethodRepository: Send + Sync {
    /// Registers a payment method.
    async fn create_payment_method(&self, method: NewPaymentMethod) -> Result<PaymentMethod>;
}

/// Read and write access to payments.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Persists a payment for `purchase`.
    ///
    /// Fails with `DuplicatePayment` if the purchase already has a payment
    /// that is not cancelled. The purchase itself is not modified.
    async fn create_payment(
        &self,
        payment: NewPayment,
        purchase: &Purchase,
    ) -> Result<PaymentAggregate>;

    /// Loads a payment together with its purchase.
    ///
    /// Returns None if the payment doesn't exist.
    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentAggregate>>;

    /// Writes the payment back.
    ///
    /// Fails with `ConcurrencyConflict` if the stored version differs from
    /// `payment.version`. Returns the payment at its new version.
    async fn update_payment(&self, payment: &Payment) -> Result<Payment>;
}

/// Every collaborator the payment lifecycle needs, behind one bound.
pub trait Store:
    PurchaseQuery
    + PurchaseRepository
    + PaymentMethodQuery
    + PaymentMethodRepository
    + PaymentRepository
{
}

// Blanket implementation for anything implementing every repository
impl<T> Store for T where
    T: PurchaseQuery
        + PurchaseRepository
        + PaymentMethodQuery
        + PaymentMethodRepository
        + PaymentRepository
        + ?Sized
{
}

/// Rejects a write whose version no longer matches the stored one.
pub(crate) fn check_version(
    entity: &'static str,
    id: i64,
    expected: common::Version,
    actual: common::Version,
) -> Result<()> {
    if expected != actual {
        return Err(crate::StoreError::ConcurrencyConflict {
            entity,
            id,
            expected,
            actual,
        });
    }
    Ok(())
}
