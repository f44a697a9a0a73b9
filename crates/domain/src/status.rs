//! Purchase and payment status state machines.

use serde::{Deserialize, Serialize};

/// The status of a purchase in its lifecycle.
///
/// Payment-driven transitions:
/// ```text
/// Creating ──process──► Paid
/// Creating ──initiate─► Completing ──finalize──► Completed
///                       Completing ──cancel────► Creating
/// ```
///
/// `InPreparation` through `Finalized` belong to the kitchen queue and are
/// only carried through persistence here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Products are being selected; the only status that accepts a payment.
    #[default]
    Creating,

    /// Paid through the synchronous flow.
    Paid,

    /// Cancelled by the client or the restaurant.
    Cancelled,

    /// Payment confirmed through the asynchronous flow.
    Completed,

    /// Being prepared in the kitchen.
    InPreparation,

    /// Ready to be handed to the client.
    ReadyForDelivery,

    /// Handed to the client.
    Delivered,

    /// Closed.
    Finalized,

    /// Payment initiated, awaiting provider confirmation.
    Completing,
}

impl PurchaseStatus {
    /// Returns true if a payment may be processed or initiated in this status.
    pub fn can_receive_payment(&self) -> bool {
        matches!(self, PurchaseStatus::Creating)
    }

    /// Returns true if the purchase is waiting for an asynchronous confirmation.
    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self, PurchaseStatus::Completing)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Creating => "creating",
            PurchaseStatus::Paid => "paid",
            PurchaseStatus::Cancelled => "cancelled",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::InPreparation => "in_preparation",
            PurchaseStatus::ReadyForDelivery => "ready_for_delivery",
            PurchaseStatus::Delivered => "delivered",
            PurchaseStatus::Finalized => "finalized",
            PurchaseStatus::Completing => "completing",
        }
    }

    /// Returns the persisted status code.
    pub fn code(&self) -> i16 {
        match self {
            PurchaseStatus::Creating => 1,
            PurchaseStatus::Paid => 2,
            PurchaseStatus::Cancelled => 3,
            PurchaseStatus::Completed => 4,
            PurchaseStatus::InPreparation => 5,
            PurchaseStatus::ReadyForDelivery => 6,
            PurchaseStatus::Delivered => 7,
            PurchaseStatus::Finalized => 8,
            PurchaseStatus::Completing => 9,
        }
    }

    /// Parses a persisted status code.
    pub fn from_code(code: i16) -> Option<Self> {
        let status = match code {
            1 => PurchaseStatus::Creating,
            2 => PurchaseStatus::Paid,
            3 => PurchaseStatus::Cancelled,
            4 => PurchaseStatus::Completed,
            5 => PurchaseStatus::InPreparation,
            6 => PurchaseStatus::ReadyForDelivery,
            7 => PurchaseStatus::Delivered,
            8 => PurchaseStatus::Finalized,
            9 => PurchaseStatus::Completing,
            _ => return None,
        };
        Some(status)
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The status of a payment.
///
/// ```text
/// (new) ──process──► Paid
/// (new) ──initiate─► Processing ──finalize──► Paid
///       Pending | Processing ──cancel──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Registered, not yet sent to the provider.
    #[default]
    Pending,

    /// Accepted by the provider, awaiting confirmation.
    Processing,

    /// Settled (terminal state).
    Paid,

    /// Cancelled (terminal state).
    Cancelled,
}

impl PaymentStatus {
    /// Returns true once the payment is settled; no transition leaves this status.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }

    /// Returns true if the payment may still be cancelled or finalized.
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }

    /// Returns true if this payment still counts against its purchase.
    pub fn is_active(&self) -> bool {
        !matches!(self, PaymentStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Returns the persisted status code.
    pub fn code(&self) -> i16 {
        match self {
            PaymentStatus::Pending => 1,
            PaymentStatus::Processing => 2,
            PaymentStatus::Paid => 3,
            PaymentStatus::Cancelled => 4,
        }
    }

    /// Parses a persisted status code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(PaymentStatus::Pending),
            2 => Some(PaymentStatus::Processing),
            3 => Some(PaymentStatus::Paid),
            4 => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
