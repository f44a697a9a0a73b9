//! Shared types for the order payments backend.

mod types;

pub use types::{ClientId, PaymentId, PaymentMethodId, ProductId, PurchaseId, Version};
