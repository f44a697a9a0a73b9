//! Payment lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{PaymentId, PaymentMethodId, PurchaseId};
use domain::{PaymentAggregate, PaymentMethod};
use payments::PaymentService;
use serde::Deserialize;
use store::Store;

use super::parse_id;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub payments: PaymentService<S>,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    pub purchase_id: PurchaseId,
    pub payment_method_id: PaymentMethodId,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

// -- Handlers --

/// POST /payment/: start an asynchronous payment confirmed by webhook.
#[tracing::instrument(skip(state))]
pub async fn initiate<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<InitiatePaymentRequest>,
) -> Result<Json<PaymentAggregate>, ApiError> {
    let aggregate = state
        .payments
        .initiate_purchase_payment(req.purchase_id, req.payment_method_id, req.webhook_url)
        .await?;

    Ok(Json(aggregate))
}

/// POST /payment/:purchase_id/:payment_method_id: charge a purchase synchronously.
#[tracing::instrument(skip(state))]
pub async fn process<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((purchase_id, payment_method_id)): Path<(String, String)>,
) -> Result<Json<PaymentAggregate>, ApiError> {
    let purchase_id: PurchaseId = parse_id(&purchase_id)?;
    let payment_method_id: PaymentMethodId = parse_id(&payment_method_id)?;

    let aggregate = state
        .payments
        .process_purchase_payment(purchase_id, payment_method_id)
        .await?;

    Ok(Json(aggregate))
}

/// GET /payment/methods: list payment methods.
#[tracing::instrument(skip(state))]
pub async fn list_methods<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<PaymentMethod>>, ApiError> {
    Ok(Json(state.payments.list_payment_methods().await?))
}

/// GET /payment/:id: load a payment with its purchase.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentAggregate>, ApiError> {
    let payment_id: PaymentId = parse_id(&id)?;
    let aggregate = state
        .payments
        .get_payment(payment_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(aggregate))
}

/// POST /payment/:id/cancel: provider reports the payment was cancelled.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentAggregate>, ApiError> {
    let payment_id: PaymentId = parse_id(&id)?;
    Ok(Json(state.payments.cancel_purchase_payment(payment_id).await?))
}

/// POST /payment/:id/finalize: provider confirms the payment.
#[tracing::instrument(skip(state))]
pub async fn finalize<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentAggregate>, ApiError> {
    let payment_id: PaymentId = parse_id(&id)?;
    Ok(Json(
        state.payments.finalize_purchase_payment(payment_id).await?,
    ))
}
