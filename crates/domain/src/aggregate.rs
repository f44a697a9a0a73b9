//! Aggregates returned by lookups and lifecycle operations.

use serde::{Deserialize, Serialize};

use crate::payment::Payment;
use crate::purchase::Purchase;

/// A purchase bundled with its latest payment, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseAggregate {
    pub purchase: Purchase,
    pub payment: Option<Payment>,
}

impl PurchaseAggregate {
    /// Returns the payment still counting against the purchase.
    ///
    /// A cancelled payment stays linked for history but no longer blocks a
    /// new payment attempt.
    pub fn active_payment(&self) -> Option<&Payment> {
        self.payment.as_ref().filter(|p| p.status.is_active())
    }
}

/// A payment bundled with the purchase it settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAggregate {
    pub payment: Payment,
    pub purchase: Option<Purchase>,
}
