//! Submitted orders and their totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{mask_card_number, CardType};
use crate::checkout::{DraftOrder, InlineCard};
use crate::customer::CustomerInfo;
use crate::ids::{OrderId, PaymentMethodId, UserId};
use crate::payment_method::PaymentMethod;
use crate::plan::Plan;

/// Flat tax rate applied to every order, in percent.
pub const TAX_RATE_PERCENT: i64 = 10;

/// Subtotal, tax and total of an order, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Plan price.
    pub subtotal_cents: i64,
    /// Tax at [`TAX_RATE_PERCENT`], rounded half-up to the cent.
    pub tax_cents: i64,
    /// Subtotal plus tax.
    pub total_cents: i64,
}

impl OrderTotals {
    /// Totals for a given subtotal.
    #[must_use]
    pub fn for_subtotal(subtotal_cents: i64) -> Self {
        let scaled = subtotal_cents * TAX_RATE_PERCENT;
        let tax_cents = if scaled >= 0 {
            (scaled + 50) / 100
        } else {
            (scaled - 50) / 100
        };
        Self {
            subtotal_cents,
            tax_cents,
            total_cents: subtotal_cents + tax_cents,
        }
    }

    /// Totals for buying one plan.
    #[must_use]
    pub fn for_plan(plan: &Plan) -> Self {
        Self::for_subtotal(plan.price_cents)
    }
}

/// What an order remembers about how it was paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MaskedPayment {
    /// Card typed during checkout.
    Inline {
        /// `**** **** **** 1234`.
        card_number: String,
        /// Name on the card.
        card_name: String,
        /// `MM/YY`.
        expiry_date: String,
        /// Always `***`.
        cvv: String,
    },
    /// A saved payment method.
    Saved {
        /// The saved method used.
        method_id: PaymentMethodId,
        /// Its network.
        card_type: CardType,
        /// Its last four digits.
        last_four: String,
        /// Name on the card.
        cardholder_name: String,
        /// `MM/YY`.
        expiry_date: String,
    },
}

impl MaskedPayment {
    /// Mask a card typed during checkout.
    #[must_use]
    pub fn from_inline(card: &InlineCard) -> Self {
        Self::Inline {
            card_number: mask_card_number(&card.card_number),
            card_name: card.card_name.clone(),
            expiry_date: card.expiry_date.clone(),
            cvv: "***".to_string(),
        }
    }

    /// Reference a saved method.
    #[must_use]
    pub fn from_saved(method: &PaymentMethod) -> Self {
        Self::Saved {
            method_id: method.id.clone(),
            card_type: method.card_type,
            last_four: method.last_four.clone(),
            cardholder_name: method.cardholder_name.clone(),
            expiry_date: method.expiry_date.clone(),
        }
    }

    /// Last four digits of the card charged.
    #[must_use]
    pub fn last_four(&self) -> &str {
        match self {
            Self::Inline { card_number, .. } => card_number
                .char_indices()
                .rev()
                .nth(3)
                .map_or(card_number.as_str(), |(i, _)| &card_number[i..]),
            Self::Saved { last_four, .. } => last_four,
        }
    }
}

/// Returned to the caller when an order is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    /// The new order's identifier.
    pub order_id: OrderId,
    /// When it was accepted.
    pub timestamp: DateTime<Utc>,
}

/// A submitted order. Read-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// `ORD-XXXXXXXX`.
    pub order_id: OrderId,
    /// Owner of the order.
    pub user_id: UserId,
    /// When the order was accepted.
    pub timestamp: DateTime<Utc>,
    /// Contact details at submission time.
    pub customer_info: CustomerInfo,
    /// Masked payment details.
    pub payment_info: MaskedPayment,
    /// Plan purchased.
    pub plan: Plan,
    /// Amounts charged.
    pub totals: OrderTotals,
}

impl Order {
    /// Snapshot a draft into an order.
    #[must_use]
    pub fn from_draft(
        order_id: OrderId,
        user_id: UserId,
        draft: &DraftOrder,
        payment_info: MaskedPayment,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            user_id,
            timestamp,
            customer_info: draft.customer_info.clone(),
            payment_info,
            plan: draft.plan.clone(),
            totals: OrderTotals::for_plan(&draft.plan),
        }
    }

    /// The receipt handed back at submission.
    #[must_use]
    pub fn receipt(&self) -> OrderReceipt {
        OrderReceipt {
            order_id: self.order_id.clone(),
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanCatalog;

    #[test]
    fn last_four_counts_characters() {
        let card = InlineCard {
            card_number: "4242 4242 4242 42é4".into(),
            card_name: "Jane Roe".into(),
            expiry_date: "12/30".into(),
            cvv: "123".into(),
        };
        assert_eq!(MaskedPayment::from_inline(&card).last_four(), "42é4");

        let short = MaskedPayment::Inline {
            card_number: "é1".into(),
            card_name: String::new(),
            expiry_date: String::new(),
            cvv: String::new(),
        };
        assert_eq!(short.last_four(), "é1");
    }

    #[test]
    fn totals_round_tax_to_cents() {
        let totals = OrderTotals::for_subtotal(1999);
        assert_eq!(totals.tax_cents, 200);
        assert_eq!(totals.total_cents, 2199);

        let totals = OrderTotals::for_subtotal(5999);
        assert_eq!(totals.tax_cents, 600);
        assert_eq!(totals.total_cents, 6599);

        let totals = OrderTotals::for_subtotal(2499);
        assert_eq!(totals.tax_cents, 250);
        assert_eq!(totals.total_cents, 2749);

        assert_eq!(OrderTotals::for_subtotal(0).total_cents, 0);
    }

    #[test]
    fn inline_payment_is_masked() {
        let card = InlineCard {
            card_number: "4111 1111 1111 1234".into(),
            card_name: "Jane Roe".into(),
            expiry_date: "12/30".into(),
            cvv: "123".into(),
        };
        let masked = MaskedPayment::from_inline(&card);
        assert_eq!(masked.last_four(), "1234");
        let json = serde_json::to_value(&masked).unwrap();
        assert_eq!(json["kind"], "inline");
        assert_eq!(json["cardNumber"], "**** **** **** 1234");
        assert_eq!(json["cvv"], "***");
    }

    #[test]
    fn order_snapshots_plan_totals() {
        let plan = PlanCatalog::default().resolve(Some("japan-3gb"));
        let draft = DraftOrder::new(plan);
        let order = Order::from_draft(
            OrderId::generate(),
            UserId::generate(),
            &draft,
            MaskedPayment::from_inline(&draft_card()),
            Utc::now(),
        );
        assert_eq!(order.totals.subtotal_cents, 1999);
        assert_eq!(order.totals.total_cents, 2199);
        assert_eq!(order.receipt().order_id, order.order_id);
    }

    fn draft_card() -> InlineCard {
        InlineCard {
            card_number: "4242424242424242".into(),
            ..InlineCard::default()
        }
    }
}
