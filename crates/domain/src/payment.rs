//! Payment and payment-method entities.

use chrono::{DateTime, Utc};
use common::{PaymentId, PaymentMethodId, PurchaseId, Version};
use serde::{Deserialize, Serialize};

use crate::status::PaymentStatus;
use crate::value_objects::Money;

/// A configured way to pay, mapped to a provider through `sys_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub name: String,
    /// Identifier of the provider implementation handling this method.
    pub sys_name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// Input for registering a payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaymentMethod {
    pub name: String,
    pub sys_name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl NewPaymentMethod {
    /// Creates an active payment method.
    pub fn active(name: impl Into<String>, sys_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sys_name: sys_name.into(),
            description: None,
            is_active: true,
        }
    }

    /// Creates an inactive payment method.
    pub fn inactive(name: impl Into<String>, sys_name: impl Into<String>) -> Self {
        Self {
            is_active: false,
            ..Self::active(name, sys_name)
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A payment settling (or attempting to settle) a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub payment_method: PaymentMethod,
    pub value: Money,
    pub status: PaymentStatus,
    /// Where the provider confirms an asynchronous payment.
    pub webhook_url: Option<String>,
    pub purchase_id: PurchaseId,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a payment; the repository attaches it to a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub payment_method: PaymentMethod,
    pub value: Money,
    pub status: PaymentStatus,
    pub webhook_url: Option<String>,
}

impl NewPayment {
    /// A payment settled immediately by a synchronous provider.
    pub fn settled(payment_method: PaymentMethod, value: Money) -> Self {
        Self {
            payment_method,
            value,
            status: PaymentStatus::Paid,
            webhook_url: None,
        }
    }

    /// A payment accepted by the provider and awaiting confirmation.
    pub fn awaiting_confirmation(
        payment_method: PaymentMethod,
        value: Money,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            payment_method,
            value,
            status: PaymentStatus::Processing,
            webhook_url,
        }
    }
}
