//! Error types for the eSIM shop.

use crate::card::FieldErrors;
use crate::checkout::CheckoutStep;

/// Result type for shop operations.
pub type Result<T> = std::result::Result<T, ShopError>;

/// Errors that can occur in shop operations.
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    /// Saved payment method not found.
    #[error("payment method not found: {id}")]
    PaymentMethodNotFound {
        /// The payment method ID that was not found.
        id: String,
    },

    /// Order not found.
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// The order ID that was not found.
        order_id: String,
    },

    /// Checkout session not found.
    #[error("checkout not found: {checkout_id}")]
    CheckoutNotFound {
        /// The checkout ID that was not found.
        checkout_id: String,
    },
}

/// Why a checkout submission was refused or failed.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Submission is only possible from the review step.
    #[error("checkout is at the {step} step, submit from review")]
    NotAtReview {
        /// Where the wizard currently is.
        step: CheckoutStep,
    },

    /// A submission is already in flight.
    #[error("order submission already in progress")]
    SubmissionInProgress,

    /// The order was already placed.
    #[error("order already submitted")]
    AlreadySubmitted,

    /// The draft order has invalid fields.
    #[error("order is incomplete: {0}")]
    Invalid(FieldErrors),

    /// The order processor rejected or failed the order.
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Failures reported by an order processor.
///
/// All of them leave the checkout re-submittable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// The payment was declined.
    #[error("payment declined: {reason}")]
    Declined {
        /// Reason given by the gateway.
        reason: String,
    },

    /// The gateway did not answer in time.
    #[error("payment gateway timed out")]
    GatewayTimeout,

    /// The submission was abandoned before it completed.
    #[error("order submission cancelled")]
    Cancelled,

    /// The order could not be recorded.
    #[error("order could not be recorded: {0}")]
    Unavailable(String),
}
