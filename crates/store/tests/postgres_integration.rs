//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{ClientId, PaymentId, ProductId, PurchaseId, Version};
use domain::{
    Client, Currency, Money, NewPayment, NewPaymentMethod, NewPurchase, PaymentStatus, Product,
    PurchaseStatus, SelectedProduct,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    PaymentMethodQuery, PaymentMethodRepository, PaymentRepository, PostgresStore, PurchaseQuery,
    PurchaseRepository, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_payment_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;
    let store = PostgresStore::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE payments, purchases, payment_methods RESTART IDENTITY CASCADE")
        .execute(store.pool())
        .await
        .unwrap();

    store
}

fn new_purchase(cents: i64) -> NewPurchase {
    let burger = Product::new(
        ProductId::new(1),
        "Burger",
        Money::from_cents(cents, Currency::brl()),
        "Lanche",
    );
    let cheese = Product::new(
        ProductId::new(2),
        "Cheese",
        Money::zero(Currency::brl()),
        "Acompanhamento",
    );
    NewPurchase::new(
        Client::new(ClientId::new(10), "Maria"),
        vec![SelectedProduct::new(burger).with_component(cheese)],
    )
    .unwrap()
}

#[tokio::test]
#[serial]
async fn create_and_load_purchase() {
    let store = get_test_store().await;

    let created = store.create_purchase(new_purchase(2500)).await.unwrap();
    assert_eq!(created.id, PurchaseId::new(1));
    assert_eq!(created.status, PurchaseStatus::Creating);
    assert_eq!(created.version, Version::first());

    let loaded = store.get_purchase(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.purchase.client.name, "Maria");
    assert_eq!(loaded.purchase.total.cents(), 2500);
    assert_eq!(loaded.purchase.selected_products.len(), 1);
    assert_eq!(loaded.purchase.selected_products[0].added_components.len(), 1);
    assert!(loaded.payment.is_none());
}

#[tokio::test]
#[serial]
async fn missing_purchase_returns_none() {
    let store = get_test_store().await;
    assert!(
        store
            .get_purchase(PurchaseId::new(404))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn payment_methods_are_listed_in_id_order() {
    let store = get_test_store().await;

    store
        .create_payment_method(
            NewPaymentMethod::active("Cash", "default").with_description("Pay at the counter"),
        )
        .await
        .unwrap();
    store
        .create_payment_method(NewPaymentMethod::inactive("Card", "default"))
        .await
        .unwrap();

    let methods = store.list_payment_methods().await.unwrap();
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[0].name, "Cash");
    assert_eq!(methods[0].description.as_deref(), Some("Pay at the counter"));
    assert!(!methods[1].is_active);

    let card = store
        .get_payment_method(methods[1].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(card.name, "Card");
}

#[tokio::test]
#[serial]
async fn paying_a_purchase_links_payment() {
    let store = get_test_store().await;
    let purchase = store.create_purchase(new_purchase(1800)).await.unwrap();
    let method = store
        .create_payment_method(NewPaymentMethod::active("Cash", "default"))
        .await
        .unwrap();

    let created = store
        .create_payment(NewPayment::settled(method, purchase.total.clone()), &purchase)
        .await
        .unwrap();
    assert_eq!(created.payment.status, PaymentStatus::Paid);

    let mut paid = purchase.clone();
    paid.status = PurchaseStatus::Paid;
    let updated = store
        .update_purchase(&paid, Some(&created.payment))
        .await
        .unwrap();
    assert_eq!(updated.version, Version::new(2));

    let loaded = store.get_purchase(purchase.id).await.unwrap().unwrap();
    assert_eq!(loaded.purchase.status, PurchaseStatus::Paid);
    let payment = loaded.payment.unwrap();
    assert_eq!(payment.id, created.payment.id);
    assert_eq!(payment.payment_method.name, "Cash");
    assert_eq!(payment.value.cents(), 1800);

    let by_payment = store.get_payment(payment.id).await.unwrap().unwrap();
    assert_eq!(by_payment.purchase.unwrap().id, purchase.id);
}

#[tokio::test]
#[serial]
async fn stale_purchase_update_conflicts() {
    let store = get_test_store().await;
    let purchase = store.create_purchase(new_purchase(1000)).await.unwrap();

    let mut first = purchase.clone();
    first.status = PurchaseStatus::Paid;
    store.update_purchase(&first, None).await.unwrap();

    let mut stale = purchase.clone();
    stale.status = PurchaseStatus::Cancelled;
    let err = store.update_purchase(&stale, None).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::ConcurrencyConflict { expected, actual, .. }
            if expected == Version::first() && actual == Version::new(2)
    ));
}

#[tokio::test]
#[serial]
async fn updating_missing_purchase_is_not_found() {
    let store = get_test_store().await;
    let mut ghost = store.create_purchase(new_purchase(1000)).await.unwrap();
    ghost.id = PurchaseId::new(999);

    let err = store.update_purchase(&ghost, None).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { id: 999, .. }));
}

#[tokio::test]
#[serial]
async fn second_active_payment_is_rejected() {
    let store = get_test_store().await;
    let purchase = store.create_purchase(new_purchase(1000)).await.unwrap();
    let method = store
        .create_payment_method(NewPaymentMethod::active("Cash", "default"))
        .await
        .unwrap();

    store
        .create_payment(
            NewPayment::settled(method.clone(), purchase.total.clone()),
            &purchase,
        )
        .await
        .unwrap();

    let err = store
        .create_payment(NewPayment::settled(method, purchase.total.clone()), &purchase)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicatePayment { purchase_id } if purchase_id == purchase.id
    ));
}

#[tokio::test]
#[serial]
async fn cancelled_payment_frees_the_purchase() {
    let store = get_test_store().await;
    let purchase = store.create_purchase(new_purchase(1000)).await.unwrap();
    let method = store
        .create_payment_method(NewPaymentMethod::active("Pix", "default"))
        .await
        .unwrap();

    let first = store
        .create_payment(
            NewPayment::awaiting_confirmation(
                method.clone(),
                purchase.total.clone(),
                Some("https://hooks.example.com/pix".to_string()),
            ),
            &purchase,
        )
        .await
        .unwrap();
    assert_eq!(
        first.payment.webhook_url.as_deref(),
        Some("https://hooks.example.com/pix")
    );

    let mut cancelled = first.payment.clone();
    cancelled.status = PaymentStatus::Cancelled;
    let cancelled = store.update_payment(&cancelled).await.unwrap();
    assert_eq!(cancelled.version, Version::new(2));

    let retry = store
        .create_payment(NewPayment::settled(method, purchase.total.clone()), &purchase)
        .await;
    assert!(retry.is_ok());
}

#[tokio::test]
#[serial]
async fn stale_payment_update_conflicts() {
    let store = get_test_store().await;
    let purchase = store.create_purchase(new_purchase(1000)).await.unwrap();
    let method = store
        .create_payment_method(NewPaymentMethod::active("Pix", "default"))
        .await
        .unwrap();
    let created = store
        .create_payment(
            NewPayment::awaiting_confirmation(method, purchase.total.clone(), None),
            &purchase,
        )
        .await
        .unwrap();

    let mut paid = created.payment.clone();
    paid.status = PaymentStatus::Paid;
    store.update_payment(&paid).await.unwrap();

    let err = store.update_payment(&paid).await.unwrap_err();
    assert!(matches!(err, StoreError::ConcurrencyConflict { .. }));

    assert!(
        store
            .get_payment(PaymentId::new(12345))
            .await
            .unwrap()
            .is_none()
    );
}
