//! API handlers.

pub mod checkout;
pub mod health;
pub mod orders;
pub mod payment_methods;
pub mod plans;
pub mod session;

use chrono::{NaiveDate, Utc};

/// The date card expiry is judged against.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
