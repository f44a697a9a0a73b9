//! Domain layer for the order payments backend.
//!
//! This crate provides:
//! - Purchase and payment status state machines
//! - Money and currency value objects
//! - Purchase, payment and payment-method entities
//! - The aggregates exchanged with stores and the HTTP layer

pub mod aggregate;
pub mod error;
pub mod payment;
pub mod purchase;
pub mod status;
pub mod value_objects;

pub use aggregate::{PaymentAggregate, PurchaseAggregate};
pub use error::DomainError;
pub use payment::{NewPayment, NewPaymentMethod, Payment, PaymentMethod};
pub use purchase::{Client, NewPurchase, Product, Purchase, SelectedProduct};
pub use status::{PaymentStatus, PurchaseStatus};
pub use value_objects::{Currency, Money};
