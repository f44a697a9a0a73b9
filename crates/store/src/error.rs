use common::{PurchaseId, Version};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row to update does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The row was changed by someone else since it was read.
    #[error(
        "Concurrency conflict for {entity} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        entity: &'static str,
        id: i64,
        expected: Version,
        actual: Version,
    },

    /// The purchase already has a payment that is not cancelled.
    #[error("Purchase {purchase_id} already has an active payment")]
    DuplicatePayment { purchase_id: PurchaseId },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row holds a value the domain does not recognise.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
