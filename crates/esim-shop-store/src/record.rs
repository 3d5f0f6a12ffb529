//! Stored record shapes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use esim_shop_core::PaymentMethods;

/// A user's payment method collection as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPaymentMethods {
    /// The collection, most recently added first.
    pub methods: PaymentMethods,
    /// After this instant the record is treated as absent.
    pub expires_at: DateTime<Utc>,
}

impl StoredPaymentMethods {
    /// Wrap a collection written at `now`, live for `ttl`.
    #[must_use]
    pub fn new(methods: PaymentMethods, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            methods,
            expires_at: now + ttl,
        }
    }

    /// Whether the record has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
