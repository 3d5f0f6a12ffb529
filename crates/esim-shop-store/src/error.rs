//! Error types for eSIM shop storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An order with this ID is already stored.
    #[error("order already exists: {id}")]
    OrderExists {
        /// The order ID that is taken.
        id: String,
    },

    /// The payment method is not in the user's collection.
    #[error("payment method not found: {id}")]
    PaymentMethodNotFound {
        /// The payment method ID that was not found.
        id: String,
    },
}
