pub mod cache;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cache::{CachedStore, PurchaseCache};
pub use common::Version;
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    PaymentMethodQuery, PaymentMethodRepository, PaymentRepository, PurchaseQuery,
    PurchaseRepository, Store,
};
