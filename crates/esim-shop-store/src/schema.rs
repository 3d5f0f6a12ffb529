//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Saved payment method collections, keyed by `user_id`.
    /// One value per user holding the whole collection.
    pub const PAYMENT_METHODS: &str = "payment_methods";

    /// Submitted orders, keyed by `order_id`.
    pub const ORDERS: &str = "orders";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::PAYMENT_METHODS, cf::ORDERS]
}
