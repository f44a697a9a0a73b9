//! Integration tests for the purchase/payment lifecycle.

use common::{ClientId, PaymentId, PaymentMethodId, ProductId, PurchaseId};
use domain::{
    Client, Currency, Money, NewPayment, NewPaymentMethod, NewPurchase, PaymentMethod,
    PaymentStatus, Product, Purchase, PurchaseStatus, SelectedProduct,
};
use payments::{
    InMemoryPaymentProvider, PaymentError, PaymentService, ProviderError, ProviderOperation,
    ProviderOutcome, ProviderRegistry, ValidationError,
};
use store::{
    CachedStore, InMemoryStore, PaymentMethodRepository, PaymentRepository, PurchaseQuery,
    PurchaseRepository, Store, StoreError,
};

struct TestHarness<S: Store = InMemoryStore> {
    service: PaymentService<S>,
    store: S,
    provider: InMemoryPaymentProvider,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_store(InMemoryStore::new())
    }
}

impl TestHarness<CachedStore<InMemoryStore>> {
    fn cached() -> Self {
        Self::with_store(CachedStore::new(InMemoryStore::new()))
    }
}

impl<S: Store + Clone> TestHarness<S> {
    fn with_store(store: S) -> Self {
        let provider = InMemoryPaymentProvider::new();
        let registry = ProviderRegistry::new().with_provider("mock", provider.clone());

        Self {
            service: PaymentService::new(store.clone(), registry),
            store,
            provider,
        }
    }

    async fn create_purchase(&self, cents: i64) -> Purchase {
        let product = Product::new(
            ProductId::new(1),
            "X-Burger",
            Money::from_cents(cents, Currency::brl()),
            "Lanche",
        );
        let purchase = NewPurchase::new(
            Client::new(ClientId::new(1), "Maria"),
            vec![SelectedProduct::new(product)],
        )
        .unwrap();
        self.store.create_purchase(purchase).await.unwrap()
    }

    async fn create_purchase_with_status(&self, cents: i64, status: PurchaseStatus) -> Purchase {
        let mut purchase = self.create_purchase(cents).await;
        purchase.status = status;
        self.store.update_purchase(&purchase, None).await.unwrap()
    }

    async fn create_method(&self, active: bool) -> PaymentMethod {
        let method = if active {
            NewPaymentMethod::active("Mercado Pago", "mock")
        } else {
            NewPaymentMethod::inactive("Mercado Pago", "mock")
        };
        self.store.create_payment_method(method).await.unwrap()
    }

    async fn initiate(&self) -> (Purchase, PaymentId) {
        let purchase = self.create_purchase(1000).await;
        let method = self.create_method(true).await;
        let aggregate = self
            .service
            .initiate_purchase_payment(
                purchase.id,
                method.id,
                Some("https://hooks.example.com/payments".to_string()),
            )
            .await
            .unwrap();
        (purchase, aggregate.payment.id)
    }

    async fn purchase_status(&self, id: PurchaseId) -> PurchaseStatus {
        self.store
            .get_purchase(id)
            .await
            .unwrap()
            .unwrap()
            .purchase
            .status
    }
}

fn validation(err: PaymentError) -> ValidationError {
    match err {
        PaymentError::Validation(v) => v,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn process_settles_purchase_and_payment() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(1000).await;
    let method = h.create_method(true).await;

    let aggregate = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap();

    assert_eq!(aggregate.payment.status, PaymentStatus::Paid);
    assert_eq!(aggregate.payment.value.cents(), 1000);
    assert_eq!(aggregate.payment.payment_method.id, method.id);
    let updated = aggregate.purchase.unwrap();
    assert_eq!(updated.status, PurchaseStatus::Paid);

    let loaded = h.store.get_purchase(purchase.id).await.unwrap().unwrap();
    assert_eq!(loaded.purchase.status, PurchaseStatus::Paid);
    assert_eq!(loaded.payment.unwrap().id, aggregate.payment.id);
    assert_eq!(h.provider.call_count(ProviderOperation::Process), 1);
}

#[tokio::test]
async fn process_rejects_missing_purchase() {
    let h = TestHarness::new();
    let method = h.create_method(true).await;

    let err = h
        .service
        .process_purchase_payment(PurchaseId::new(99), method.id)
        .await
        .unwrap_err();

    assert_eq!(validation(err), ValidationError::PurchaseNotFound);
    assert_eq!(h.provider.total_calls(), 0);
}

#[tokio::test]
async fn process_rejects_purchase_not_in_creating() {
    let h = TestHarness::new();
    let purchase = h
        .create_purchase_with_status(1000, PurchaseStatus::InPreparation)
        .await;
    let method = h.create_method(true).await;

    let err = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Purchase is not valid for payment.");
    assert_eq!(validation(err), ValidationError::PurchaseNotPayable);
    assert_eq!(h.provider.total_calls(), 0);
}

#[tokio::test]
async fn paid_purchase_rejects_both_flows_before_provider() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(1000).await;
    let method = h.create_method(true).await;
    h.service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap();
    let calls_before = h.provider.total_calls();

    let err = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::PurchaseAlreadyPaid);

    let err = h
        .service
        .initiate_purchase_payment(purchase.id, method.id, None)
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::PurchaseAlreadyPaid);

    assert_eq!(h.provider.total_calls(), calls_before);
}

#[tokio::test]
async fn zero_total_is_rejected_without_persistence() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(0).await;
    let method = h.create_method(true).await;
    let writes_before = h.store.write_count().await;

    let err = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Purchase value cannot be zero or negative"
    );

    let err = h
        .service
        .initiate_purchase_payment(purchase.id, method.id, None)
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::NonPositiveValue);

    assert_eq!(h.store.write_count().await, writes_before);
    assert_eq!(h.provider.total_calls(), 0);
}

#[tokio::test]
async fn non_positive_total_wins_over_status() {
    let h = TestHarness::new();
    let purchase = h
        .create_purchase_with_status(0, PurchaseStatus::Delivered)
        .await;
    let method = h.create_method(true).await;

    let err = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::NonPositiveValue);
}

#[tokio::test]
async fn missing_payment_method_is_rejected() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(1000).await;

    let err = h
        .service
        .process_purchase_payment(purchase.id, PaymentMethodId::new(42))
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::PaymentMethodNotFound);
}

#[tokio::test]
async fn inactive_payment_method_rejects_both_flows() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(1000).await;
    let method = h.create_method(false).await;

    let err = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::PaymentMethodInactive);

    let err = h
        .service
        .initiate_purchase_payment(purchase.id, method.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Payment method is inactive.");
    assert_eq!(h.provider.total_calls(), 0);
}

#[tokio::test]
async fn unregistered_provider_is_a_validation_error() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(1000).await;
    let method = h
        .store
        .create_payment_method(NewPaymentMethod::active("Pix", "pix"))
        .await
        .unwrap();

    let err = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::UnknownProvider("pix".to_string())
    );
}

#[tokio::test]
async fn declined_process_persists_nothing() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(1000).await;
    let method = h.create_method(true).await;
    h.provider
        .set_outcome(ProviderOperation::Process, ProviderOutcome::Decline);
    let writes_before = h.store.write_count().await;

    let err = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::ProcessingFailed));
    assert_eq!(h.store.write_count().await, writes_before);
    assert_eq!(h.store.payment_count().await, 0);
    assert_eq!(h.purchase_status(purchase.id).await, PurchaseStatus::Creating);
}

#[tokio::test]
async fn provider_error_on_initiate_persists_nothing() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(1000).await;
    let method = h.create_method(true).await;
    h.provider.set_outcome(
        ProviderOperation::Initiate,
        ProviderOutcome::Fail(ProviderError::Transport("connection reset".to_string())),
    );
    let writes_before = h.store.write_count().await;

    let err = h
        .service
        .initiate_purchase_payment(purchase.id, method.id, None)
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::ProcessingFailed));
    assert_eq!(h.store.write_count().await, writes_before);
    assert_eq!(h.purchase_status(purchase.id).await, PurchaseStatus::Creating);
}

#[tokio::test]
async fn initiate_leaves_payment_awaiting_confirmation() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(2590).await;
    let method = h.create_method(true).await;

    let aggregate = h
        .service
        .initiate_purchase_payment(
            purchase.id,
            method.id,
            Some("https://hooks.example.com/payments".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(aggregate.payment.status, PaymentStatus::Processing);
    assert_eq!(
        aggregate.payment.webhook_url.as_deref(),
        Some("https://hooks.example.com/payments")
    );
    assert_eq!(
        aggregate.purchase.unwrap().status,
        PurchaseStatus::Completing
    );
}

#[tokio::test]
async fn cancel_reopens_purchase() {
    let h = TestHarness::new();
    let (purchase, payment_id) = h.initiate().await;

    let aggregate = h.service.cancel_purchase_payment(payment_id).await.unwrap();

    assert_eq!(aggregate.payment.status, PaymentStatus::Cancelled);
    assert_eq!(aggregate.purchase.unwrap().status, PurchaseStatus::Creating);
    assert_eq!(h.purchase_status(purchase.id).await, PurchaseStatus::Creating);
    assert_eq!(h.provider.call_count(ProviderOperation::Cancel), 1);
}

#[tokio::test]
async fn cancelled_purchase_can_be_paid_again() {
    let h = TestHarness::new();
    let (purchase, payment_id) = h.initiate().await;
    h.service.cancel_purchase_payment(payment_id).await.unwrap();

    let method = h.create_method(true).await;
    let aggregate = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap();

    assert_ne!(aggregate.payment.id, payment_id);
    assert_eq!(h.purchase_status(purchase.id).await, PurchaseStatus::Paid);
}

#[tokio::test]
async fn cached_store_reflects_each_transition() {
    let h = TestHarness::cached();
    let (purchase, payment_id) = h.initiate().await;
    assert_eq!(h.purchase_status(purchase.id).await, PurchaseStatus::Completing);

    h.service.cancel_purchase_payment(payment_id).await.unwrap();
    assert_eq!(h.purchase_status(purchase.id).await, PurchaseStatus::Creating);

    let method = h.create_method(true).await;
    h.service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap();
    assert_eq!(h.purchase_status(purchase.id).await, PurchaseStatus::Paid);

    let err = h
        .service
        .process_purchase_payment(purchase.id, method.id)
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::PurchaseAlreadyPaid);
    assert_eq!(h.provider.call_count(ProviderOperation::Process), 1);
}

#[tokio::test]
async fn cached_store_finalize_completes_purchase() {
    let h = TestHarness::cached();
    let (purchase, payment_id) = h.initiate().await;
    h.purchase_status(purchase.id).await;

    h.service.finalize_purchase_payment(payment_id).await.unwrap();

    let loaded = h.store.get_purchase(purchase.id).await.unwrap().unwrap();
    assert_eq!(loaded.purchase.status, PurchaseStatus::Completed);
    assert_eq!(loaded.payment.unwrap().status, PaymentStatus::Paid);
    assert_eq!(h.store.cache().len().await, 1);
}

#[tokio::test]
async fn finalize_completes_purchase() {
    let h = TestHarness::new();
    let (purchase, payment_id) = h.initiate().await;

    let aggregate = h
        .service
        .finalize_purchase_payment(payment_id)
        .await
        .unwrap();

    assert_eq!(aggregate.payment.status, PaymentStatus::Paid);
    assert_eq!(h.purchase_status(purchase.id).await, PurchaseStatus::Completed);
}

#[tokio::test]
async fn settled_payment_cannot_be_cancelled_or_finalized() {
    let h = TestHarness::new();
    let (_, payment_id) = h.initiate().await;
    h.service
        .finalize_purchase_payment(payment_id)
        .await
        .unwrap();

    let err = h
        .service
        .cancel_purchase_payment(payment_id)
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::PaymentAlreadyPaid);

    let err = h
        .service
        .finalize_purchase_payment(payment_id)
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::PaymentAlreadyPaid);
    assert_eq!(h.provider.call_count(ProviderOperation::Cancel), 0);
    assert_eq!(h.provider.call_count(ProviderOperation::Finalize), 1);
}

#[tokio::test]
async fn cancelled_payment_is_not_open() {
    let h = TestHarness::new();
    let (_, payment_id) = h.initiate().await;
    h.service.cancel_purchase_payment(payment_id).await.unwrap();

    let err = h
        .service
        .finalize_purchase_payment(payment_id)
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::PaymentNotOpen);
}

#[tokio::test]
async fn pending_payment_can_be_cancelled() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(1000).await;
    let method = h.create_method(true).await;
    let pending = NewPayment {
        status: PaymentStatus::Pending,
        ..NewPayment::awaiting_confirmation(method, purchase.total.clone(), None)
    };
    let created = h.store.create_payment(pending, &purchase).await.unwrap();

    let aggregate = h
        .service
        .cancel_purchase_payment(created.payment.id)
        .await
        .unwrap();
    assert_eq!(aggregate.payment.status, PaymentStatus::Cancelled);
}

#[tokio::test]
async fn unknown_payment_cannot_be_cancelled() {
    let h = TestHarness::new();

    let err = h
        .service
        .cancel_purchase_payment(PaymentId::new(5))
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::PaymentNotFound);
}

#[tokio::test]
async fn declined_finalize_changes_nothing() {
    let h = TestHarness::new();
    let (purchase, payment_id) = h.initiate().await;
    h.provider
        .set_outcome(ProviderOperation::Finalize, ProviderOutcome::Decline);
    let writes_before = h.store.write_count().await;

    let err = h
        .service
        .finalize_purchase_payment(payment_id)
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::FinalizationFailed));
    assert_eq!(h.store.write_count().await, writes_before);
    assert_eq!(h.purchase_status(purchase.id).await, PurchaseStatus::Completing);
    let payment = h.service.get_payment(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.payment.status, PaymentStatus::Processing);
}

#[tokio::test]
async fn declined_cancel_changes_nothing() {
    let h = TestHarness::new();
    let (_, payment_id) = h.initiate().await;
    h.provider
        .set_outcome(ProviderOperation::Cancel, ProviderOutcome::Fail(ProviderError::Timeout));

    let err = h
        .service
        .cancel_purchase_payment(payment_id)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::CancellationFailed));
    assert_eq!(err.to_string(), "Failed to cancel payment.");
}

#[tokio::test]
async fn concurrent_process_commits_once() {
    let h = TestHarness::new();
    let purchase = h.create_purchase(1000).await;
    let method = h.create_method(true).await;

    let (first, second) = tokio::join!(
        h.service.process_purchase_payment(purchase.id, method.id),
        h.service.process_purchase_payment(purchase.id, method.id),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(
        loser,
        PaymentError::Validation(ValidationError::PurchaseAlreadyPaid)
            | PaymentError::Store(StoreError::DuplicatePayment { .. })
    ));
    assert_eq!(h.store.payment_count().await, 1);
}
