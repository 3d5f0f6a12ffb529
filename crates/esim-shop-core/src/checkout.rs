//! The three-step checkout wizard.
//!
//! A checkout walks `Information → Payment → Review` strictly in order. The
//! wizard owns a [`DraftOrder`] that each step patches, and submission hands the
//! finished draft to an [`OrderProcessor`].
//!
//! # Submission
//!
//! [`CheckoutWizard::submit`] is only accepted at the review step and only once.
//! While the processor runs the wizard is marked submitting; if the processor
//! fails, or the submit future is dropped before it resolves, the wizard goes
//! back to a submittable state so the shopper can try again.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{validate_card_fields, FieldErrors};
use crate::customer::{validate_required, CustomerInfo, CustomerInfoPatch};
use crate::error::{CheckoutError, SubmissionError};
use crate::ids::{CheckoutId, PaymentMethodId, UserId};
use crate::order::{OrderReceipt, OrderTotals};
use crate::plan::Plan;

// ============================================================================
// Steps
// ============================================================================

/// A step of the checkout wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Contact details.
    Information,
    /// Card selection or entry.
    Payment,
    /// Final confirmation.
    Review,
}

impl CheckoutStep {
    /// Steps in wizard order.
    pub const ALL: [Self; 3] = [Self::Information, Self::Payment, Self::Review];

    /// Zero-based position of the step.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Information => 0,
            Self::Payment => 1,
            Self::Review => 2,
        }
    }

    /// The following step, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Information => Some(Self::Payment),
            Self::Payment => Some(Self::Review),
            Self::Review => None,
        }
    }

    /// The preceding step, if any.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Information => None,
            Self::Payment => Some(Self::Information),
            Self::Review => Some(Self::Payment),
        }
    }

    /// Lowercase step name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Information => "information",
            Self::Payment => "payment",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Draft order
// ============================================================================

/// Card details typed during checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineCard {
    /// Full card number as typed.
    pub card_number: String,
    /// Name on the card.
    pub card_name: String,
    /// `MM/YY`.
    pub expiry_date: String,
    /// Security code.
    pub cvv: String,
}

/// How the order will be paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PaymentInfo {
    /// A saved payment method, by reference.
    Saved {
        /// The method to charge.
        method_id: PaymentMethodId,
    },
    /// A card typed into the form.
    Inline(InlineCard),
}

impl Default for PaymentInfo {
    fn default() -> Self {
        Self::Inline(InlineCard::default())
    }
}

/// A change to the payment section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PaymentInfoPatch {
    /// Pay with a saved method.
    UseSaved {
        /// The method to charge.
        method_id: PaymentMethodId,
    },
    /// Edit the typed card; unset fields are kept.
    Inline {
        /// New card number.
        #[serde(default)]
        card_number: Option<String>,
        /// New name on the card.
        #[serde(default)]
        card_name: Option<String>,
        /// New expiry.
        #[serde(default)]
        expiry_date: Option<String>,
        /// New security code.
        #[serde(default)]
        cvv: Option<String>,
    },
}

/// A change scoped to one section of the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPatch {
    /// Contact details.
    CustomerInfo(CustomerInfoPatch),
    /// Payment details.
    PaymentInfo(PaymentInfoPatch),
}

/// The order being assembled by a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrder {
    /// Contact details.
    pub customer_info: CustomerInfo,
    /// Payment details.
    pub payment_info: PaymentInfo,
    /// The plan being bought; fixed for the life of the checkout.
    pub plan: Plan,
}

impl DraftOrder {
    /// An empty draft for `plan`.
    #[must_use]
    pub fn new(plan: Plan) -> Self {
        Self {
            customer_info: CustomerInfo::default(),
            payment_info: PaymentInfo::default(),
            plan,
        }
    }

    /// Shallow-merge a section patch. No cross-section checks are made.
    pub fn merge(&mut self, patch: SectionPatch) {
        match patch {
            SectionPatch::CustomerInfo(patch) => self.customer_info.apply(patch),
            SectionPatch::PaymentInfo(PaymentInfoPatch::UseSaved { method_id }) => {
                self.payment_info = PaymentInfo::Saved { method_id };
            }
            SectionPatch::PaymentInfo(PaymentInfoPatch::Inline {
                card_number,
                card_name,
                expiry_date,
                cvv,
            }) => {
                if !matches!(self.payment_info, PaymentInfo::Inline(_)) {
                    self.payment_info = PaymentInfo::Inline(InlineCard::default());
                }
                if let PaymentInfo::Inline(card) = &mut self.payment_info {
                    if let Some(v) = card_number {
                        card.card_number = v;
                    }
                    if let Some(v) = card_name {
                        card.card_name = v;
                    }
                    if let Some(v) = expiry_date {
                        card.expiry_date = v;
                    }
                    if let Some(v) = cvv {
                        card.cvv = v;
                    }
                }
            }
        }
    }

    /// Validate everything needed to place the order.
    #[must_use]
    pub fn validate(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = self.customer_info.validate();
        match &self.payment_info {
            PaymentInfo::Inline(card) => errors.extend(validate_card_fields(
                &card.card_number,
                &card.card_name,
                &card.expiry_date,
                &card.cvv,
                today,
            )),
            PaymentInfo::Saved { method_id } => {
                errors.check("paymentMethod", validate_required(method_id.as_str()));
            }
        }
        errors
    }

    /// Subtotal, tax and total for this draft.
    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        OrderTotals::for_plan(&self.plan)
    }
}

// ============================================================================
// Order processing seam
// ============================================================================

/// Accepts finished drafts and turns them into orders.
#[async_trait]
pub trait OrderProcessor: Send + Sync {
    /// Place the order described by `draft`.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmissionError`] if the order could not be placed.
    async fn process_order(&self, draft: &DraftOrder) -> Result<OrderReceipt, SubmissionError>;
}

// ============================================================================
// Wizard
// ============================================================================

/// State of one shopper's checkout.
#[derive(Debug, Clone)]
pub struct CheckoutWizard {
    id: CheckoutId,
    user_id: UserId,
    step: CheckoutStep,
    draft: DraftOrder,
    submitting: bool,
    receipt: Option<OrderReceipt>,
    created_at: DateTime<Utc>,
}

/// Abandons the submission if dropped before [`SubmittingGuard::finish`]; after
/// it, the drop is a no-op.
struct SubmittingGuard<'a> {
    wizard: &'a mut CheckoutWizard,
}

impl SubmittingGuard<'_> {
    fn finish(
        self,
        outcome: Result<OrderReceipt, SubmissionError>,
    ) -> Result<OrderReceipt, CheckoutError> {
        self.wizard.complete_submit(outcome)
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.wizard.abandon_submit();
    }
}

impl CheckoutWizard {
    /// Start a checkout for `plan` at the information step.
    #[must_use]
    pub fn new(user_id: UserId, plan: Plan) -> Self {
        Self {
            id: CheckoutId::generate(),
            user_id,
            step: CheckoutStep::Information,
            draft: DraftOrder::new(plan),
            submitting: false,
            receipt: None,
            created_at: Utc::now(),
        }
    }

    /// Start a checkout with `method` preselected for payment.
    #[must_use]
    pub fn with_saved_method(user_id: UserId, plan: Plan, method: &PaymentMethodId) -> Self {
        let mut wizard = Self::new(user_id, plan);
        wizard.draft.payment_info = PaymentInfo::Saved {
            method_id: method.clone(),
        };
        wizard
    }

    /// Checkout identifier.
    #[must_use]
    pub const fn id(&self) -> CheckoutId {
        self.id
    }

    /// Shopper the checkout belongs to.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    /// The draft so far.
    #[must_use]
    pub const fn draft(&self) -> &DraftOrder {
        &self.draft
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Receipt of the placed order, once submitted.
    #[must_use]
    pub const fn receipt(&self) -> Option<&OrderReceipt> {
        self.receipt.as_ref()
    }

    /// Whether the order was placed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.receipt.is_some()
    }

    /// When the checkout started.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Totals shown in the order summary.
    #[must_use]
    pub fn order_summary(&self) -> OrderTotals {
        self.draft.totals()
    }

    /// Move forward one step; stays put at review.
    pub fn advance(&mut self) -> CheckoutStep {
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        self.step
    }

    /// Move back one step; stays put at information.
    pub fn retreat(&mut self) -> CheckoutStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Merge a partial update into one section of the draft.
    pub fn merge_section(&mut self, patch: SectionPatch) {
        self.draft.merge(patch);
    }

    /// Mark the checkout as submitting and hand back the draft to process.
    ///
    /// The caller must follow up with [`Self::complete_submit`] or
    /// [`Self::abandon_submit`]; until then further submits are refused.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::AlreadySubmitted`] once an order was placed.
    /// - [`CheckoutError::SubmissionInProgress`] while a submission is in flight.
    /// - [`CheckoutError::NotAtReview`] before the review step.
    /// - [`CheckoutError::Invalid`] if the draft has invalid fields.
    pub fn begin_submit(&mut self, today: NaiveDate) -> Result<DraftOrder, CheckoutError> {
        if self.receipt.is_some() {
            return Err(CheckoutError::AlreadySubmitted);
        }
        if self.submitting {
            return Err(CheckoutError::SubmissionInProgress);
        }
        if self.step != CheckoutStep::Review {
            return Err(CheckoutError::NotAtReview { step: self.step });
        }
        let errors = self.draft.validate(today);
        if !errors.is_empty() {
            return Err(CheckoutError::Invalid(errors));
        }

        self.submitting = true;
        Ok(self.draft.clone())
    }

    /// Record the outcome of a submission started with [`Self::begin_submit`].
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Submission`] if the processor failed; the
    /// wizard stays at review and can be submitted again.
    pub fn complete_submit(
        &mut self,
        outcome: Result<OrderReceipt, SubmissionError>,
    ) -> Result<OrderReceipt, CheckoutError> {
        self.submitting = false;
        match outcome {
            Ok(receipt) => {
                tracing::info!(
                    checkout_id = %self.id,
                    order_id = %receipt.order_id,
                    "Checkout completed"
                );
                self.receipt = Some(receipt.clone());
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(checkout_id = %self.id, error = %e, "Order submission failed");
                Err(e.into())
            }
        }
    }

    /// Drop a submission that will never complete, making the checkout
    /// submittable again.
    pub fn abandon_submit(&mut self) {
        if self.submitting {
            tracing::debug!(checkout_id = %self.id, "Order submission abandoned");
        }
        self.submitting = false;
    }

    /// Submit the draft to `processor`, validating it against `today` first.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_submit`] and [`Self::complete_submit`].
    pub async fn submit<P>(
        &mut self,
        processor: &P,
        today: NaiveDate,
    ) -> Result<OrderReceipt, CheckoutError>
    where
        P: OrderProcessor + ?Sized,
    {
        let draft = self.begin_submit(today)?;

        let guard = SubmittingGuard { wizard: self };
        let outcome = processor.process_order(&draft).await;
        guard.finish(outcome)
    }
}
