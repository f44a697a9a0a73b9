//! Purchase/payment lifecycle service.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use common::{PaymentId, PaymentMethodId, PurchaseId};
use domain::{
    NewPayment, Payment, PaymentAggregate, PaymentMethod, PaymentStatus, Purchase,
    PurchaseStatus,
};
use store::{
    PaymentMethodQuery, PaymentRepository, PurchaseQuery, PurchaseRepository, Store, StoreError,
};

use crate::error::{PaymentError, ProviderError, Result, ValidationError};
use crate::provider::PaymentProvider;
use crate::registry::ProviderRegistry;

const OP_PROCESS: &str = "process";
const OP_INITIATE: &str = "initiate";
const OP_CANCEL: &str = "cancel";
const OP_FINALIZE: &str = "finalize";

/// Drives purchases and their payments through the payment lifecycle.
///
/// Every operation reads current state, checks its preconditions, calls the
/// provider selected by the payment method's `sys_name`, and only then
/// persists the new state. A declined or failed provider call leaves
/// everything untouched.
pub struct PaymentService<S: Store> {
    store: S,
    providers: ProviderRegistry,
}

impl<S: Store> PaymentService<S> {
    /// Creates a new payment service.
    pub fn new(store: S, providers: ProviderRegistry) -> Self {
        Self { store, providers }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the provider registry.
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Charges a purchase synchronously.
    ///
    /// On approval the purchase becomes `paid` together with a new `paid`
    /// payment for its total.
    #[tracing::instrument(skip(self))]
    pub async fn process_purchase_payment(
        &self,
        purchase_id: PurchaseId,
        payment_method_id: PaymentMethodId,
    ) -> Result<PaymentAggregate> {
        self.observe(OP_PROCESS, async {
            let (purchase, method, provider) = self
                .check_purchase_payable(purchase_id, payment_method_id)
                .await?;

            if !Self::call_provider(OP_PROCESS, provider.process_payment(&purchase)).await {
                return Err(PaymentError::ProcessingFailed);
            }

            let payment = NewPayment::settled(method, purchase.total.clone());
            self.persist_new_payment(OP_PROCESS, purchase, payment, PurchaseStatus::Paid)
                .await
        })
        .await
    }

    /// Starts an asynchronous charge confirmed later by the provider.
    ///
    /// On acceptance the purchase moves to `completing` and a `processing`
    /// payment remembers where the provider will call back.
    #[tracing::instrument(skip(self))]
    pub async fn initiate_purchase_payment(
        &self,
        purchase_id: PurchaseId,
        payment_method_id: PaymentMethodId,
        webhook_url: Option<String>,
    ) -> Result<PaymentAggregate> {
        self.observe(OP_INITIATE, async {
            let (purchase, method, provider) = self
                .check_purchase_payable(purchase_id, payment_method_id)
                .await?;

            if !Self::call_provider(OP_INITIATE, provider.initiate_payment(&purchase)).await {
                return Err(PaymentError::ProcessingFailed);
            }

            let payment =
                NewPayment::awaiting_confirmation(method, purchase.total.clone(), webhook_url);
            self.persist_new_payment(OP_INITIATE, purchase, payment, PurchaseStatus::Completing)
                .await
        })
        .await
    }

    /// Cancels an unsettled payment and reopens its purchase.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_purchase_payment(&self, payment_id: PaymentId) -> Result<PaymentAggregate> {
        self.observe(OP_CANCEL, async {
            let (payment, purchase, provider) = self.check_payment_open(payment_id).await?;

            if !Self::call_provider(OP_CANCEL, provider.cancel_payment(&payment)).await {
                return Err(PaymentError::CancellationFailed);
            }

            self.persist_transition(
                OP_CANCEL,
                payment,
                PaymentStatus::Cancelled,
                purchase,
                PurchaseStatus::Creating,
            )
            .await
        })
        .await
    }

    /// Confirms an unsettled payment and completes its purchase.
    #[tracing::instrument(skip(self))]
    pub async fn finalize_purchase_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<PaymentAggregate> {
        self.observe(OP_FINALIZE, async {
            let (payment, purchase, provider) = self.check_payment_open(payment_id).await?;

            if !Self::call_provider(OP_FINALIZE, provider.finalize_payment(&payment)).await {
                return Err(PaymentError::FinalizationFailed);
            }

            self.persist_transition(
                OP_FINALIZE,
                payment,
                PaymentStatus::Paid,
                purchase,
                PurchaseStatus::Completed,
            )
            .await
        })
        .await
    }

    /// Lists every payment method.
    pub async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        Ok(self.store.list_payment_methods().await?)
    }

    /// Loads a payment method.
    pub async fn get_payment_method(&self, id: PaymentMethodId) -> Result<Option<PaymentMethod>> {
        Ok(self.store.get_payment_method(id).await?)
    }

    /// Loads a payment with its purchase.
    pub async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentAggregate>> {
        Ok(self.store.get_payment(id).await?)
    }

    /// Preconditions shared by process and initiate, in reporting order.
    async fn check_purchase_payable(
        &self,
        purchase_id: PurchaseId,
        payment_method_id: PaymentMethodId,
    ) -> Result<(Purchase, PaymentMethod, Arc<dyn PaymentProvider>)> {
        let aggregate = self
            .store
            .get_purchase(purchase_id)
            .await?
            .ok_or(ValidationError::PurchaseNotFound)?;

        if aggregate.active_payment().is_some() {
            return Err(ValidationError::PurchaseAlreadyPaid.into());
        }

        let purchase = aggregate.purchase;
        if !purchase.total.is_positive() {
            return Err(ValidationError::NonPositiveValue.into());
        }
        if !purchase.status.can_receive_payment() {
            return Err(ValidationError::PurchaseNotPayable.into());
        }

        let method = self
            .store
            .get_payment_method(payment_method_id)
            .await?
            .ok_or(ValidationError::PaymentMethodNotFound)?;
        if !method.is_active {
            return Err(ValidationError::PaymentMethodInactive.into());
        }

        let provider = self.resolve_provider(&method)?;
        Ok((purchase, method, provider))
    }

    /// Preconditions shared by cancel and finalize, in reporting order.
    async fn check_payment_open(
        &self,
        payment_id: PaymentId,
    ) -> Result<(Payment, Purchase, Arc<dyn PaymentProvider>)> {
        let aggregate = self
            .store
            .get_payment(payment_id)
            .await?
            .ok_or(ValidationError::PaymentNotFound)?;

        let payment = aggregate.payment;
        if payment.status.is_settled() {
            return Err(ValidationError::PaymentAlreadyPaid.into());
        }
        if !payment.status.is_open() {
            return Err(ValidationError::PaymentNotOpen.into());
        }
        let purchase = aggregate
            .purchase
            .ok_or(ValidationError::PaymentWithoutPurchase)?;

        let provider = self.resolve_provider(&payment.payment_method)?;
        Ok((payment, purchase, provider))
    }

    fn resolve_provider(&self, method: &PaymentMethod) -> Result<Arc<dyn PaymentProvider>> {
        self.providers
            .resolve(&method.sys_name)
            .ok_or_else(|| ValidationError::UnknownProvider(method.sys_name.clone()).into())
    }

    /// Runs a provider call, returning whether it approved.
    async fn call_provider<F>(operation: &'static str, call: F) -> bool
    where
        F: Future<Output = std::result::Result<bool, ProviderError>>,
    {
        let start = Instant::now();
        let result = call.await;
        metrics::histogram!("payment_provider_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(operation, "payment provider declined");
                false
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "payment provider call failed");
                false
            }
        }
    }

    async fn persist_new_payment(
        &self,
        operation: &'static str,
        mut purchase: Purchase,
        payment: NewPayment,
        purchase_status: PurchaseStatus,
    ) -> Result<PaymentAggregate> {
        let created = self
            .store
            .create_payment(payment, &purchase)
            .await
            .inspect_err(|e| Self::log_unrecorded(operation, purchase.id, e))?;

        purchase.status = purchase_status;
        let purchase = self
            .store
            .update_purchase(&purchase, Some(&created.payment))
            .await
            .inspect_err(|e| Self::log_unrecorded(operation, purchase.id, e))?;

        Ok(PaymentAggregate {
            payment: created.payment,
            purchase: Some(purchase),
        })
    }

    async fn persist_transition(
        &self,
        operation: &'static str,
        mut payment: Payment,
        payment_status: PaymentStatus,
        mut purchase: Purchase,
        purchase_status: PurchaseStatus,
    ) -> Result<PaymentAggregate> {
        payment.status = payment_status;
        let payment = self
            .store
            .update_payment(&payment)
            .await
            .inspect_err(|e| Self::log_unrecorded(operation, purchase.id, e))?;

        purchase.status = purchase_status;
        let purchase = self
            .store
            .update_purchase(&purchase, None)
            .await
            .inspect_err(|e| Self::log_unrecorded(operation, purchase.id, e))?;

        Ok(PaymentAggregate {
            payment,
            purchase: Some(purchase),
        })
    }

    /// The provider already accepted, so a failed write leaves the two out of step.
    fn log_unrecorded(operation: &'static str, purchase_id: PurchaseId, error: &StoreError) {
        tracing::error!(
            operation,
            %purchase_id,
            %error,
            "provider accepted the operation but its result could not be persisted"
        );
    }

    async fn observe<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        metrics::counter!("payment_operations_total", "operation" => operation).increment(1);

        let result = fut.await;
        match &result {
            Ok(_) => tracing::info!(operation, "payment operation succeeded"),
            Err(e) => {
                let reason = failure_reason(e);
                metrics::counter!(
                    "payment_failures_total",
                    "operation" => operation,
                    "reason" => reason
                )
                .increment(1);
                tracing::warn!(operation, reason, error = %e, "payment operation failed");
            }
        }
        result
    }
}

fn failure_reason(error: &PaymentError) -> &'static str {
    match error {
        PaymentError::Validation(_) => "validation",
        PaymentError::ProcessingFailed
        | PaymentError::CancellationFailed
        | PaymentError::FinalizationFailed => "provider",
        PaymentError::Store(
            StoreError::ConcurrencyConflict { .. } | StoreError::DuplicatePayment { .. },
        ) => "conflict",
        PaymentError::Store(_) => "store",
    }
}
