//! Request and response types for the eSIM shop client.

use serde::{Deserialize, Serialize};

use esim_shop_core::{CheckoutId, CheckoutStep, DraftOrder, Order, OrderReceipt, Plan};

/// Health check response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// `ok` when the service is up.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Checkouts currently held in memory.
    pub active_checkouts: usize,
}

/// A newly issued session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Session id to send with later requests.
    pub session_id: String,
}

/// A catalog plan with its display price.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetails {
    /// The plan.
    #[serde(flatten)]
    pub plan: Plan,
    /// Price as dollars, e.g. `$19.99`.
    pub price_formatted: String,
}

/// Edit request for a saved card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentMethodRequest {
    /// New name on the card.
    pub card_name: String,
    /// New `MM/YY`.
    pub expiry_date: String,
    /// Make this the default card.
    pub make_default: bool,
    /// Replacement card number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    /// Security code of the replacement card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,
}

/// Delete response.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    /// Always true.
    pub success: bool,
}

/// Start checkout request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCheckoutRequest {
    /// Plan to buy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
}

/// Totals shown beside the checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    /// The plan being bought.
    pub plan: Plan,
    /// Plan price in cents.
    pub subtotal_cents: i64,
    /// Tax in cents.
    pub tax_cents: i64,
    /// Amount charged in cents.
    pub total_cents: i64,
    /// Subtotal as dollars.
    pub subtotal_formatted: String,
    /// Tax as dollars.
    pub tax_formatted: String,
    /// Total as dollars.
    pub total_formatted: String,
}

/// A checkout as the service reports it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutState {
    /// Checkout id.
    pub id: CheckoutId,
    /// Current step.
    pub step: CheckoutStep,
    /// Zero-based step position.
    pub step_index: usize,
    /// Order being assembled.
    pub draft: DraftOrder,
    /// Totals.
    pub summary: OrderSummary,
    /// Whether a submission is in flight.
    pub submitting: bool,
    /// Whether the order was placed.
    pub complete: bool,
    /// Receipt, once placed.
    #[serde(default)]
    pub receipt: Option<OrderReceipt>,
}

/// A placed order with its formatted total.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    /// The order.
    #[serde(flatten)]
    pub order: Order,
    /// Total as dollars.
    pub total_formatted: String,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetails,
}

/// API error details.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetails {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
