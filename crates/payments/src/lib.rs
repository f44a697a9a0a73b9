//! Purchase/payment lifecycle.
//!
//! [`PaymentService`] moves a purchase and its payment through their
//! statuses:
//!
//! - synchronous: `creating` purchase is processed and becomes `paid`
//! - asynchronous: the payment is initiated (purchase `completing`), then
//!   finalized (purchase `completed`) or cancelled (purchase back to `creating`)
//!
//! External processors plug in through [`PaymentProvider`], looked up by the
//! payment method's `sys_name` in a [`ProviderRegistry`].

pub mod error;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod service;

pub use error::{PaymentError, ProviderError, Result, ValidationError};
pub use provider::PaymentProvider;
pub use providers::{
    DefaultPaymentProvider, InMemoryPaymentProvider, ProviderOperation, ProviderOutcome,
};
pub use registry::ProviderRegistry;
pub use service::PaymentService;
