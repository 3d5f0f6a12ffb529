//! Saved payment methods and the rules for mutating a user's collection.
//!
//! [`PaymentMethods`] is the only place that rewrites a collection, so the
//! single-default invariant holds for every caller: at most one method in a
//! collection has `is_default` set, and setting it on one clears it on the rest
//! in the same mutation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::card::{
    infer_card_type, last_four, validate_card_number, validate_cardholder_name, validate_cvv,
    validate_expiry_date_at, CardType, FieldErrors,
};
use crate::error::{Result, ShopError};
use crate::ids::PaymentMethodId;

/// A saved card. Only derived card data is kept; the full number and CVV never are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    /// Opaque identifier, fixed at creation.
    pub id: PaymentMethodId,
    /// Network inferred from the leading digit.
    pub card_type: CardType,
    /// Last four digits of the card number.
    pub last_four: String,
    /// `MM/YY`.
    pub expiry_date: String,
    /// Name printed on the card.
    pub cardholder_name: String,
    /// Whether this card is preselected at checkout.
    pub is_default: bool,
}

/// Input for saving a new card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPaymentMethod {
    /// Full card number, spaces allowed.
    pub card_number: String,
    /// Name on the card.
    pub card_name: String,
    /// `MM/YY`.
    pub expiry_date: String,
    /// Security code; checked if present, never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,
    /// Make this the default card.
    #[serde(default)]
    pub make_default: bool,
}

impl NewPaymentMethod {
    /// Validate the card form as of `today`.
    #[must_use]
    pub fn validate(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.check("cardNumber", validate_card_number(&self.card_number));
        errors.check("cardName", validate_cardholder_name(&self.card_name));
        errors.check("expiryDate", validate_expiry_date_at(&self.expiry_date, today));
        if let Some(cvv) = &self.cvv {
            errors.check("cvv", validate_cvv(cvv));
        }
        errors
    }
}

/// Input for editing a saved card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodUpdate {
    /// Card being edited.
    pub id: PaymentMethodId,
    /// New name on the card.
    pub card_name: String,
    /// New `MM/YY`.
    pub expiry_date: String,
    /// New default flag.
    #[serde(default)]
    pub make_default: bool,
    /// Replacement card number; type and last four are re-derived when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    /// Security code of the replacement card; checked, never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,
}

impl PaymentMethodUpdate {
    /// The replacement card number, if one was actually supplied.
    #[must_use]
    pub fn replacement_number(&self) -> Option<&str> {
        self.card_number
            .as_deref()
            .filter(|number| !number.trim().is_empty())
    }

    /// Validate the edit form as of `today`.
    ///
    /// Card number and CVV are only checked when the card number is being replaced.
    #[must_use]
    pub fn validate(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.check("cardName", validate_cardholder_name(&self.card_name));
        errors.check("expiryDate", validate_expiry_date_at(&self.expiry_date, today));
        if let Some(number) = self.replacement_number() {
            errors.check("cardNumber", validate_card_number(number));
            errors.check("cvv", validate_cvv(self.cvv.as_deref().unwrap_or_default()));
        }
        errors
    }
}

/// One user's saved payment methods, most recently added first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethods(Vec<PaymentMethod>);

impl PaymentMethods {
    /// An empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap stored methods as-is.
    #[must_use]
    pub fn from_vec(methods: Vec<PaymentMethod>) -> Self {
        Self(methods)
    }

    /// Demonstration cards: a default Visa ending 4242 and a Mastercard ending 5555.
    #[must_use]
    pub fn demo() -> Self {
        Self(vec![
            PaymentMethod {
                id: PaymentMethodId::generate(),
                card_type: CardType::Visa,
                last_four: "4242".into(),
                expiry_date: "12/25".into(),
                cardholder_name: "John Doe".into(),
                is_default: true,
            },
            PaymentMethod {
                id: PaymentMethodId::generate(),
                card_type: CardType::Mastercard,
                last_four: "5555".into(),
                expiry_date: "10/24".into(),
                cardholder_name: "John Doe".into(),
                is_default: false,
            },
        ])
    }

    /// Borrow the methods in collection order.
    #[must_use]
    pub fn as_slice(&self) -> &[PaymentMethod] {
        &self.0
    }

    /// Take the methods in collection order.
    #[must_use]
    pub fn into_vec(self) -> Vec<PaymentMethod> {
        self.0
    }

    /// Number of saved methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in collection order.
    pub fn iter(&self) -> std::slice::Iter<'_, PaymentMethod> {
        self.0.iter()
    }

    /// Look a method up by id.
    #[must_use]
    pub fn get(&self, id: &PaymentMethodId) -> Option<&PaymentMethod> {
        self.0.iter().find(|m| &m.id == id)
    }

    /// The method flagged default, if any.
    #[must_use]
    pub fn default_method(&self) -> Option<&PaymentMethod> {
        self.0.iter().find(|m| m.is_default)
    }

    /// The method checkout should preselect: the default, else the first.
    #[must_use]
    pub fn preferred(&self) -> Option<&PaymentMethod> {
        self.default_method().or_else(|| self.0.first())
    }

    /// Number of methods flagged default.
    #[must_use]
    pub fn default_count(&self) -> usize {
        self.0.iter().filter(|m| m.is_default).count()
    }

    /// Save a new card at the front of the collection and return it.
    ///
    /// Card type and last four are derived from the number, which is then dropped.
    pub fn save(&mut self, input: NewPaymentMethod) -> PaymentMethod {
        let method = PaymentMethod {
            id: PaymentMethodId::generate(),
            card_type: infer_card_type(&input.card_number),
            last_four: last_four(&input.card_number),
            expiry_date: input.expiry_date,
            cardholder_name: input.card_name,
            is_default: input.make_default,
        };

        if method.is_default {
            self.clear_defaults_except(None);
        }
        self.0.insert(0, method.clone());
        method
    }

    /// Apply an edit in place and return the updated method.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::PaymentMethodNotFound`] if no method has `input.id`.
    pub fn update(&mut self, input: PaymentMethodUpdate) -> Result<PaymentMethod> {
        let index = self
            .0
            .iter()
            .position(|m| m.id == input.id)
            .ok_or_else(|| ShopError::PaymentMethodNotFound {
                id: input.id.to_string(),
            })?;

        let replacement = input.replacement_number().map(|number| {
            (infer_card_type(number), last_four(number))
        });

        let method = &mut self.0[index];
        method.cardholder_name = input.card_name;
        method.expiry_date = input.expiry_date;
        method.is_default = input.make_default;
        if let Some((card_type, last_four)) = replacement {
            method.card_type = card_type;
            method.last_four = last_four;
        }

        if input.make_default {
            self.clear_defaults_except(Some(index));
        }
        Ok(self.0[index].clone())
    }

    /// Remove a method, returning it if it existed.
    ///
    /// If the removed method was the default, the first remaining method becomes
    /// the default.
    pub fn remove(&mut self, id: &PaymentMethodId) -> Option<PaymentMethod> {
        let index = self.0.iter().position(|m| &m.id == id)?;
        let removed = self.0.remove(index);
        if removed.is_default {
            if let Some(first) = self.0.first_mut() {
                first.is_default = true;
            }
        }
        Some(removed)
    }

    fn clear_defaults_except(&mut self, keep: Option<usize>) {
        for (i, method) in self.0.iter_mut().enumerate() {
            if Some(i) != keep {
                method.is_default = false;
            }
        }
    }
}

impl IntoIterator for PaymentMethods {
    type Item = PaymentMethod;
    type IntoIter = std::vec::IntoIter<PaymentMethod>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PaymentMethods {
    type Item = &'a PaymentMethod;
    type IntoIter = std::slice::Iter<'a, PaymentMethod>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_card(number: &str, make_default: bool) -> NewPaymentMethod {
        NewPaymentMethod {
            card_number: number.into(),
            card_name: "Jane Roe".into(),
            expiry_date: "12/30".into(),
            cvv: None,
            make_default,
        }
    }

    fn edit(id: &PaymentMethodId, make_default: bool) -> PaymentMethodUpdate {
        PaymentMethodUpdate {
            id: id.clone(),
            card_name: "Jane Q Roe".into(),
            expiry_date: "11/31".into(),
            make_default,
            card_number: None,
            cvv: None,
        }
    }

    #[test]
    fn save_derives_card_fields_and_prepends() {
        let mut methods = PaymentMethods::demo();
        let saved = methods.save(new_card("6011 1111 1111 1117", false));

        assert_eq!(saved.card_type, CardType::Discover);
        assert_eq!(saved.last_four, "1117");
        assert_eq!(methods.as_slice()[0].id, saved.id);
        assert_eq!(methods.len(), 3);
        assert_eq!(methods.default_count(), 1);
    }

    #[test]
    fn save_as_default_clears_other_defaults() {
        let mut methods = PaymentMethods::demo();
        let saved = methods.save(new_card("4111111111111111", true));

        assert_eq!(methods.default_count(), 1);
        assert_eq!(methods.default_method().unwrap().id, saved.id);
    }

    #[test]
    fn saved_method_does_not_keep_card_number() {
        let mut methods = PaymentMethods::new();
        methods.save(new_card("4111111111111111", false));
        let json = serde_json::to_string(&methods).unwrap();
        assert!(!json.contains("4111111111111111"));
    }

    #[test]
    fn update_missing_method_fails() {
        let mut methods = PaymentMethods::demo();
        let missing = PaymentMethodId::generate();
        let result = methods.update(edit(&missing, false));
        assert!(matches!(result, Err(ShopError::PaymentMethodNotFound { .. })));
    }

    #[test]
    fn update_as_default_keeps_exactly_one() {
        let mut methods = PaymentMethods::demo();
        let second = methods.as_slice()[1].id.clone();

        let updated = methods.update(edit(&second, true)).unwrap();

        assert!(updated.is_default);
        assert_eq!(updated.cardholder_name, "Jane Q Roe");
        assert_eq!(updated.expiry_date, "11/31");
        assert_eq!(methods.default_count(), 1);
        assert_eq!(methods.default_method().unwrap().id, second);
    }

    #[test]
    fn update_without_number_keeps_card_fields() {
        let mut methods = PaymentMethods::demo();
        let first = methods.as_slice()[0].id.clone();
        let mut input = edit(&first, true);
        input.card_number = Some("   ".into());

        let updated = methods.update(input).unwrap();
        assert_eq!(updated.card_type, CardType::Visa);
        assert_eq!(updated.last_four, "4242");
    }

    #[test]
    fn update_with_number_rederives_card_fields() {
        let mut methods = PaymentMethods::demo();
        let first = methods.as_slice()[0].id.clone();
        let mut input = edit(&first, true);
        input.card_number = Some("3782 822463 10005".into());
        input.cvv = Some("1234".into());

        let updated = methods.update(input).unwrap();
        assert_eq!(updated.card_type, CardType::Amex);
        assert_eq!(updated.last_four, "0005");
    }

    #[test]
    fn removing_default_promotes_first_remaining() {
        let mut methods = PaymentMethods::demo();
        methods.save(new_card("6011111111111117", false));
        let default_id = methods.default_method().unwrap().id.clone();

        let removed = methods.remove(&default_id).unwrap();

        assert!(removed.is_default);
        assert_eq!(methods.default_count(), 1);
        assert!(methods.as_slice()[0].is_default);
        assert_eq!(methods.as_slice()[0].card_type, CardType::Discover);
    }

    #[test]
    fn removing_missing_method_is_noop() {
        let mut methods = PaymentMethods::demo();
        assert!(methods.remove(&PaymentMethodId::generate()).is_none());
        assert_eq!(methods.len(), 2);
    }

    #[test]
    fn removing_last_method_leaves_empty() {
        let mut methods = PaymentMethods::new();
        let saved = methods.save(new_card("4111111111111111", true));
        methods.remove(&saved.id);
        assert!(methods.is_empty());
    }

    #[test]
    fn preferred_falls_back_to_first() {
        let mut methods = PaymentMethods::new();
        methods.save(new_card("4111111111111111", false));
        let top = methods.save(new_card("5555555555554444", false));
        assert_eq!(methods.preferred().unwrap().id, top.id);
    }

    #[test]
    fn validation_of_forms() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut input = new_card("4111", false);
        input.cvv = Some("1".into());
        let errors = input.validate(today);
        assert!(errors.get("cardNumber").is_some());
        assert!(errors.get("cvv").is_some());

        let id = PaymentMethodId::generate();
        let mut update = edit(&id, false);
        assert!(update.validate(today).is_empty());
        update.card_number = Some("4111111111111111".into());
        assert_eq!(update.validate(today).get("cvv"), Some("Please enter a valid CVV"));
    }

    #[test]
    fn wire_format_is_camel_case() {
        let methods = PaymentMethods::demo();
        let value = serde_json::to_value(&methods).unwrap();
        assert_eq!(value[0]["cardType"], "Visa");
        assert_eq!(value[0]["lastFour"], "4242");
        assert_eq!(value[0]["isDefault"], true);
        assert_eq!(value[1]["cardholderName"], "John Doe");
    }
}
