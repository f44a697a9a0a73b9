//! HTTP API server for the order payments backend.
//!
//! Exposes purchase creation and the payment lifecycle over REST, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{NewPaymentMethod, PaymentMethod};
use metrics_exporter_prometheus::PrometheusHandle;
use payments::{DefaultPaymentProvider, PaymentService, ProviderRegistry};
use store::{PaymentMethodQuery, PaymentMethodRepository, Store, StoreError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::payments::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/", get(routes::health::welcome))
        .route("/health_check", get(routes::health::health_check))
        .route("/health", get(routes::health::check))
        .route("/purchases", post(routes::purchases::create::<S>))
        .route("/purchases/{id}", get(routes::purchases::get::<S>))
        .route("/payment", post(routes::payments::initiate::<S>))
        .route("/payment/", post(routes::payments::initiate::<S>))
        .route("/payment/methods", get(routes::payments::list_methods::<S>))
        .route("/payment/{id}", get(routes::payments::get::<S>))
        .route("/payment/{id}/cancel", post(routes::payments::cancel::<S>))
        .route("/payment/{id}/finalize", post(routes::payments::finalize::<S>))
        .route(
            "/payment/{id}/{payment_method_id}",
            post(routes::payments::process::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around a store and provider registry.
pub fn create_state<S: Store + 'static>(store: S, providers: ProviderRegistry) -> Arc<AppState<S>> {
    Arc::new(AppState {
        payments: PaymentService::new(store, providers),
    })
}

/// Registers the built-in payment methods unless some already exist.
///
/// Returns the methods created.
pub async fn seed_payment_methods<S: Store>(store: &S) -> Result<Vec<PaymentMethod>, StoreError> {
    if !store.list_payment_methods().await?.is_empty() {
        tracing::info!("payment methods already present, skipping seed");
        return Ok(Vec::new());
    }

    let defaults = [
        NewPaymentMethod::active("Default", DefaultPaymentProvider::SYS_NAME)
            .with_description("Approves every payment immediately"),
    ];

    let mut created = Vec::with_capacity(defaults.len());
    for method in defaults {
        let method = store.create_payment_method(method).await?;
        tracing::info!(
            payment_method_id = %method.id,
            name = %method.name,
            "payment method seeded"
        );
        created.push(method);
    }
    Ok(created)
}
