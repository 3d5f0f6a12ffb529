//! Checkout wizard handlers.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use esim_shop_core::{
    format_cents, CheckoutError, CheckoutId, CheckoutStep, CheckoutWizard, CustomerInfoPatch,
    DraftOrder, OrderProcessor, OrderReceipt, PaymentInfoPatch, Plan, SectionPatch, ShopError,
    SubmissionError,
};

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::handlers::today;
use crate::sessions::lock_wizard;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Start checkout request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCheckoutRequest {
    /// Plan to buy; missing or unknown ids use the fallback plan.
    #[serde(default)]
    pub plan_id: Option<String>,
}

/// Order summary shown beside the wizard.
#[derive(Debug, Serialize)]
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

/// A checkout's full state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<OrderReceipt>,
}

impl StartCheckoutRequest {
    /// Parse a start request; an empty body asks for the defaults.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if a non-empty body is not a valid request.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))
    }
}

impl From<&CheckoutWizard> for CheckoutResponse {
    fn from(wizard: &CheckoutWizard) -> Self {
        let totals = wizard.order_summary();
        Self {
            id: wizard.id(),
            step: wizard.step(),
            step_index: wizard.step().index(),
            draft: wizard.draft().clone(),
            summary: OrderSummary {
                plan: wizard.draft().plan.clone(),
                subtotal_cents: totals.subtotal_cents,
                tax_cents: totals.tax_cents,
                total_cents: totals.total_cents,
                subtotal_formatted: format_cents(totals.subtotal_cents),
                tax_formatted: format_cents(totals.tax_cents),
                total_formatted: format_cents(totals.total_cents),
            },
            submitting: wizard.is_submitting(),
            complete: wizard.is_complete(),
            receipt: wizard.receipt().cloned(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn find(
    state: &AppState,
    session: SessionUser,
    raw_id: &str,
) -> Result<Arc<Mutex<CheckoutWizard>>, ApiError> {
    let not_found = || ShopError::CheckoutNotFound {
        checkout_id: raw_id.to_string(),
    };
    let id: CheckoutId = raw_id.parse().map_err(|_| not_found())?;
    Ok(state
        .checkouts
        .get(session.user_id, id)
        .await
        .ok_or_else(not_found)?)
}

/// Start a checkout.
///
/// The session's default saved card (or its first) is preselected for payment.
pub async fn start_checkout(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    body: Bytes,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let body = StartCheckoutRequest::from_body(&body)?;
    let plan = state.catalog.resolve(body.plan_id.as_deref());

    let methods = state.payment_methods.list(&session.user_id)?;
    let wizard = match methods.preferred() {
        Some(method) => CheckoutWizard::with_saved_method(session.user_id, plan, &method.id),
        None => CheckoutWizard::new(session.user_id, plan),
    };

    tracing::info!(
        user_id = %session.user_id,
        checkout_id = %wizard.id(),
        plan_id = %wizard.draft().plan.id,
        "Checkout started"
    );

    let response = CheckoutResponse::from(&wizard);
    state.checkouts.insert(wizard).await;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a checkout.
pub async fn get_checkout(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let wizard = find(&state, session, &id).await?;
    let wizard = lock_wizard(&wizard);
    Ok(Json(CheckoutResponse::from(&*wizard)))
}

/// Merge contact details.
pub async fn update_customer_info(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
    Json(patch): Json<CustomerInfoPatch>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let wizard = find(&state, session, &id).await?;
    let mut wizard = lock_wizard(&wizard);
    wizard.merge_section(SectionPatch::CustomerInfo(patch));
    Ok(Json(CheckoutResponse::from(&*wizard)))
}

/// Merge payment details.
pub async fn update_payment_info(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
    Json(patch): Json<PaymentInfoPatch>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let wizard = find(&state, session, &id).await?;
    let mut wizard = lock_wizard(&wizard);
    wizard.merge_section(SectionPatch::PaymentInfo(patch));
    Ok(Json(CheckoutResponse::from(&*wizard)))
}

/// Go to the next step.
pub async fn advance(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let wizard = find(&state, session, &id).await?;
    let mut wizard = lock_wizard(&wizard);
    wizard.advance();
    Ok(Json(CheckoutResponse::from(&*wizard)))
}

/// Go to the previous step.
pub async fn retreat(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let wizard = find(&state, session, &id).await?;
    let mut wizard = lock_wizard(&wizard);
    wizard.retreat();
    Ok(Json(CheckoutResponse::from(&*wizard)))
}

/// Place the order.
///
/// The wizard is locked only to mark the submission as started and again to
/// record its outcome, so the checkout reads as `submitting` while the order is
/// in flight. A second submit meanwhile is refused rather than queued. If the
/// client goes away mid-submission the handler future is dropped and the
/// checkout can be submitted again.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> Result<Json<OrderReceipt>, ApiError> {
    let wizard = find(&state, session, &id).await?;
    let draft = lock_wizard(&wizard).begin_submit(today())?;
    let pending = PendingSubmission {
        wizard,
        settled: false,
    };

    let processor = state.orders.processor_for(session.user_id);
    let outcome = processor.process_order(&draft).await;
    Ok(Json(pending.complete(outcome)?))
}

/// A started submission; abandoned on drop unless completed.
struct PendingSubmission {
    wizard: Arc<Mutex<CheckoutWizard>>,
    settled: bool,
}

impl PendingSubmission {
    fn complete(
        mut self,
        outcome: Result<OrderReceipt, SubmissionError>,
    ) -> Result<OrderReceipt, CheckoutError> {
        self.settled = true;
        lock_wizard(&self.wizard).complete_submit(outcome)
    }
}

impl Drop for PendingSubmission {
    fn drop(&mut self) {
        if !self.settled {
            lock_wizard(&self.wizard).abandon_submit();
        }
    }
}
