//! Storage layer for the eSIM shop.
//!
//! This crate persists saved payment methods and submitted orders behind the
//! [`Store`] trait, with a `RocksDB` backend for production and an in-memory
//! backend for tests and ephemeral deployments.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `payment_methods`: one record per user holding the whole collection and its expiry
//! - `orders`: submitted orders, keyed by `order_id`
//!
//! Collections are read-modify-written as a unit by [`PaymentMethodRepository`],
//! which owns the expiry, demo seeding and corrupt-record policies.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use esim_shop_core::{NewPaymentMethod, UserId};
//! use esim_shop_store::{MemoryStore, PaymentMethodRepository, RepositoryOptions};
//!
//! let store = MemoryStore::new();
//! let repo = PaymentMethodRepository::new(Arc::new(store), RepositoryOptions::default());
//!
//! let user_id = UserId::generate();
//! let saved = repo
//!     .save(
//!         &user_id,
//!         NewPaymentMethod {
//!             card_number: "4242 4242 4242 4242".into(),
//!             card_name: "Jane Roe".into(),
//!             expiry_date: "12/30".into(),
//!             cvv: None,
//!             make_default: true,
//!         },
//!     )
//!     .unwrap();
//! assert_eq!(saved.last_four, "4242");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod codec;
pub mod error;
pub mod keys;
pub mod memory;
pub mod record;
pub mod repository;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use record::StoredPaymentMethods;
pub use repository::{PaymentMethodRepository, RepositoryOptions, DEFAULT_PAYMENT_METHOD_TTL_DAYS};
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use esim_shop_core::{Order, OrderId, UserId};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Payment Method Operations
    // =========================================================================

    /// Get a user's stored payment method collection.
    ///
    /// Expiry is not checked here; see [`StoredPaymentMethods::is_expired`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the stored record cannot be decoded,
    /// or `StoreError::Database` if the read fails.
    fn get_payment_methods(&self, user_id: &UserId) -> Result<Option<StoredPaymentMethods>>;

    /// Replace a user's payment method collection in a single write.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_payment_methods(&self, user_id: &UserId, record: &StoredPaymentMethods) -> Result<()>;

    // =========================================================================
    // Order Operations
    // =========================================================================

    /// Insert an order. An existing order is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::OrderExists` if the order ID is already taken, or an
    /// error if the database operation fails.
    fn insert_order(&self, order: &Order) -> Result<()>;

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;
}
