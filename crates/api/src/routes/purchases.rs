//! Purchase endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ClientId, ProductId, PurchaseId};
use domain::{Client, Currency, Money, NewPurchase, Product, PurchaseAggregate, SelectedProduct};
use serde::Deserialize;
use store::{PurchaseQuery, PurchaseRepository, Store};

use super::parse_id;
use super::payments::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub client: ClientRequest,
    pub selected_products: Vec<SelectedProductRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ClientRequest {
    pub id: ClientId,
    pub name: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectedProductRequest {
    pub product: ProductRequest,
    #[serde(default)]
    pub added_components: Vec<ProductRequest>,
}

impl From<ClientRequest> for Client {
    fn from(req: ClientRequest) -> Self {
        Client {
            id: req.id,
            name: req.name,
            document: req.document,
            email: req.email,
        }
    }
}

impl From<ProductRequest> for Product {
    fn from(req: ProductRequest) -> Self {
        Product {
            description: req.description,
            ..Product::new(
                req.id,
                req.name,
                Money::from_cents(req.price_cents, Currency::brl()),
                req.category,
            )
        }
    }
}

impl From<SelectedProductRequest> for SelectedProduct {
    fn from(req: SelectedProductRequest) -> Self {
        req.added_components
            .into_iter()
            .fold(SelectedProduct::new(req.product.into()), |selected, c| {
                selected.with_component(c.into())
            })
    }
}

// -- Handlers --

/// POST /purchases: create a purchase in `creating` status.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseAggregate>), ApiError> {
    let selected_products = req.selected_products.into_iter().map(Into::into).collect();
    let purchase = NewPurchase::new(req.client.into(), selected_products)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let purchase = state.payments.store().create_purchase(purchase).await?;
    tracing::info!(purchase_id = %purchase.id, total = %purchase.total, "purchase created");

    Ok((
        StatusCode::CREATED,
        Json(PurchaseAggregate {
            purchase,
            payment: None,
        }),
    ))
}

/// GET /purchases/:id: load a purchase with its payment.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseAggregate>, ApiError> {
    let purchase_id: PurchaseId = parse_id(&id)?;
    let aggregate = state
        .payments
        .store()
        .get_purchase(purchase_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(aggregate))
}
