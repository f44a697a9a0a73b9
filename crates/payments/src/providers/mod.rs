//! Payment provider implementations.

pub mod default;
pub mod in_memory;

pub use default::DefaultPaymentProvider;
pub use in_memory::{InMemoryPaymentProvider, ProviderOperation, ProviderOutcome};
