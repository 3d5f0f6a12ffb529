//! Core types and rules for the eSIM shop.
//!
//! This crate holds the storefront's domain model, free of any transport or storage:
//!
//! - **Identifiers**: `UserId`, `CheckoutId`, `PaymentMethodId`, `OrderId`
//! - **Cards**: input formatting, card-type inference, field validation
//! - **Payment methods**: the per-user collection and its single-default rule
//! - **Plans**: the catalog and the fallback plan
//! - **Checkout**: the three-step wizard and its submission lifecycle
//! - **Orders**: submitted orders, masked payment details and totals
//!
//! # Money
//!
//! Prices are held as `i64` cents. Tax is a flat 10% of the subtotal,
//! rounded half-up to the cent, so a $19.99 plan totals $21.99.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod card;
pub mod checkout;
pub mod customer;
pub mod error;
pub mod ids;
pub mod order;
pub mod payment_method;
pub mod plan;

pub use card::{
    format_card_number, format_cvv, format_expiry_date, infer_card_type, last_four,
    mask_card_number, validate_card_fields, validate_card_number, validate_cardholder_name,
    validate_cvv, validate_expiry_date, validate_expiry_date_at, CardType, Expiry, FieldErrors,
    ValidationError,
};
pub use checkout::{
    CheckoutStep, CheckoutWizard, DraftOrder, InlineCard, OrderProcessor, PaymentInfo,
    PaymentInfoPatch, SectionPatch,
};
pub use customer::{validate_email, validate_phone, validate_required, CustomerInfo, CustomerInfoPatch};
pub use error::{CheckoutError, Result, ShopError, SubmissionError};
pub use ids::{CheckoutId, IdError, OrderId, PaymentMethodId, UserId};
pub use order::{MaskedPayment, Order, OrderReceipt, OrderTotals, TAX_RATE_PERCENT};
pub use payment_method::{NewPaymentMethod, PaymentMethod, PaymentMethodUpdate, PaymentMethods};
pub use plan::{format_cents, Plan, PlanCatalog, FALLBACK_PLAN_ID};
