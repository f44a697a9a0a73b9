//! Purchase (order) entity and the values it is built from.

use chrono::{DateTime, Utc};
use common::{ClientId, ProductId, PurchaseId, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::status::PurchaseStatus;
use crate::value_objects::Money;

/// The client who owns a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Client {
    /// Creates a client with only a name.
    pub fn new(id: ClientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            document: None,
            email: None,
        }
    }
}

/// A catalog product as it was priced when selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
}

impl Product {
    /// Creates a new product.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Money,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            price,
            category: category.into(),
        }
    }
}

/// A product chosen for a purchase, with any extra components added to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedProduct {
    pub product: Product,
    #[serde(default)]
    pub added_components: Vec<Product>,
}

impl SelectedProduct {
    /// Selects a product without components.
    pub fn new(product: Product) -> Self {
        Self {
            product,
            added_components: Vec::new(),
        }
    }

    /// Adds a component to the selection.
    pub fn with_component(mut self, component: Product) -> Self {
        self.added_components.push(component);
        self
    }

    /// Returns the product price plus every component price.
    pub fn price(&self) -> Result<Money, DomainError> {
        let mut total = self.product.price.clone();
        for component in &self.added_components {
            total = total.checked_add(&component.price)?;
        }
        Ok(total)
    }

    fn validate(&self) -> Result<(), DomainError> {
        std::iter::once(&self.product)
            .chain(&self.added_components)
            .find(|p| p.price.is_negative())
            .map_or(Ok(()), |p| {
                Err(DomainError::InvalidPrice {
                    product: p.name.clone(),
                    cents: p.price.cents(),
                })
            })
    }
}

/// A client's purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub client: Client,
    pub selected_products: Vec<SelectedProduct>,
    pub status: PurchaseStatus,
    pub total: Money,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a purchase. New purchases always start in `Creating`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub client: Client,
    pub selected_products: Vec<SelectedProduct>,
    pub total: Money,
}

impl NewPurchase {
    /// Builds a purchase whose total is the sum of the selected products.
    pub fn new(
        client: Client,
        selected_products: Vec<SelectedProduct>,
    ) -> Result<Self, DomainError> {
        let (first, rest) = selected_products
            .split_first()
            .ok_or(DomainError::NoProducts)?;

        first.validate()?;
        let mut total = first.price()?;
        for selected in rest {
            selected.validate()?;
            total = total.checked_add(&selected.price()?)?;
        }

        Ok(Self {
            client,
            selected_products,
            total,
        })
    }
}
