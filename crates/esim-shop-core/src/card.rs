//! Card field formatting and validation.
//!
//! Everything here is pure: raw keystrokes go in, canonical field values or
//! validation verdicts come out. The user-facing message for a failed check is
//! the `Display` of its [`ValidationError`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum formatted card number length: 16 digits plus 3 separating spaces.
pub const MAX_FORMATTED_CARD_NUMBER_LEN: usize = 19;

/// Maximum formatted expiry length (`MM/YY`).
pub const MAX_FORMATTED_EXPIRY_LEN: usize = 5;

/// Minimum card number length, whitespace excluded.
pub const MIN_CARD_NUMBER_DIGITS: usize = 16;

/// Minimum CVV length.
pub const MIN_CVV_LEN: usize = 3;

/// Maximum CVV length.
pub const MAX_CVV_LEN: usize = 4;

// ============================================================================
// Card type inference
// ============================================================================

/// Card network, inferred from the leading digit of the card number.
///
/// This is a single-digit stand-in for real issuer BIN tables and is kept that
/// way so stored methods classify the same as they always have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    /// Leading digit 4.
    Visa,
    /// Leading digit 5.
    Mastercard,
    /// Leading digit 3.
    Amex,
    /// Leading digit 6.
    Discover,
    /// Anything else.
    #[serde(rename = "Credit Card")]
    Unknown,
}

impl CardType {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Visa => "Visa",
            Self::Mastercard => "Mastercard",
            Self::Amex => "Amex",
            Self::Discover => "Discover",
            Self::Unknown => "Credit Card",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Infer the card type from the first character of the card number.
#[must_use]
pub fn infer_card_type(card_number: &str) -> CardType {
    match card_number.chars().find(|c| !c.is_whitespace()) {
        Some('4') => CardType::Visa,
        Some('5') => CardType::Mastercard,
        Some('3') => CardType::Amex,
        Some('6') => CardType::Discover,
        _ => CardType::Unknown,
    }
}

/// The last four characters of the card number with whitespace removed.
///
/// Shorter inputs are returned whole.
#[must_use]
pub fn last_four(card_number: &str) -> String {
    let compact = strip_whitespace(card_number);
    let skip = compact.chars().count().saturating_sub(4);
    compact.chars().skip(skip).collect()
}

/// Mask a card number down to its last four digits (`**** **** **** 4242`).
#[must_use]
pub fn mask_card_number(card_number: &str) -> String {
    format!("**** **** **** {}", last_four(card_number))
}

// ============================================================================
// Formatting
// ============================================================================

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Normalize a typed card number into groups of four.
///
/// Whitespace is removed, a space is inserted after every run of four
/// consecutive digits, and the result is cut to 19 characters. Characters other
/// than digits and whitespace are passed through untouched.
#[must_use]
pub fn format_card_number(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut run = 0;
    for c in raw.chars().filter(|c| !c.is_whitespace()) {
        out.push(c);
        if c.is_ascii_digit() {
            run += 1;
            if run == 4 {
                out.push(' ');
                run = 0;
            }
        } else {
            run = 0;
        }
    }
    out.trim_end()
        .chars()
        .take(MAX_FORMATTED_CARD_NUMBER_LEN)
        .collect()
}

/// Normalize a typed expiry date into `MM/YY`.
#[must_use]
pub fn format_expiry_date(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 2 {
        return digits;
    }
    let (month, rest) = digits.split_at(2);
    format!("{month}/{rest}")
        .chars()
        .take(MAX_FORMATTED_EXPIRY_LEN)
        .collect()
}

/// Normalize a typed CVV: digits only, at most four.
#[must_use]
pub fn format_cvv(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(MAX_CVV_LEN)
        .collect()
}

// ============================================================================
// Validation
// ============================================================================

/// A field-level validation failure.
///
/// The `Display` text is the message shown next to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Card number too short.
    #[error("Please enter a valid card number")]
    InvalidCardNumber,

    /// Expiry is not `MM/YY`.
    #[error("Please enter a valid expiry date (MM/YY)")]
    MalformedExpiry,

    /// Expiry month outside 01-12.
    #[error("Month must be between 01-12")]
    InvalidExpiryMonth,

    /// Expiry is before the current month.
    #[error("Card has expired")]
    CardExpired,

    /// CVV too short or not numeric.
    #[error("Please enter a valid CVV")]
    InvalidCvv,

    /// Cardholder name blank.
    #[error("Please enter the name on your card")]
    MissingCardholderName,

    /// A required text field is blank.
    #[error("This field is required")]
    Required,

    /// Email does not look like an address.
    #[error("Please enter a valid email address")]
    InvalidEmail,

    /// Phone does not look like a phone number.
    #[error("Please enter a valid phone number")]
    InvalidPhone,
}

/// Validate a card number: at least 16 characters once whitespace is removed.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCardNumber`] if the number is too short.
pub fn validate_card_number(value: &str) -> Result<(), ValidationError> {
    if value.chars().filter(|c| !c.is_whitespace()).count() >= MIN_CARD_NUMBER_DIGITS {
        Ok(())
    } else {
        Err(ValidationError::InvalidCardNumber)
    }
}

/// A parsed `MM/YY` expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    /// Month, 1-12.
    pub month: u32,
    /// Two-digit year.
    pub year: u32,
}

impl Expiry {
    /// Parse `MM/YY`, requiring exactly two digits on each side.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedExpiry`] or
    /// [`ValidationError::InvalidExpiryMonth`].
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let mut parts = value.split('/');
        let (Some(month), Some(year)) = (parts.next(), parts.next()) else {
            return Err(ValidationError::MalformedExpiry);
        };
        let two_digits = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_digit());
        if !two_digits(month) || !two_digits(year) {
            return Err(ValidationError::MalformedExpiry);
        }
        let month: u32 = month.parse().map_err(|_| ValidationError::MalformedExpiry)?;
        let year: u32 = year.parse().map_err(|_| ValidationError::MalformedExpiry)?;
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidExpiryMonth);
        }
        Ok(Self { month, year })
    }

    /// Whether this expiry lies strictly before the month containing `today`.
    ///
    /// Only the two-digit year is compared against `today`'s year modulo 100,
    /// so `12/99` reads as valid in 2026 and `01/20` as expired.
    #[must_use]
    pub fn is_before(&self, today: NaiveDate) -> bool {
        let current_year = today.year().rem_euclid(100).unsigned_abs();
        let current_month = today.month();
        self.year < current_year || (self.year == current_year && self.month < current_month)
    }
}

/// Validate an expiry date against the current UTC date.
///
/// # Errors
///
/// See [`validate_expiry_date_at`].
pub fn validate_expiry_date(value: &str) -> Result<(), ValidationError> {
    validate_expiry_date_at(value, Utc::now().date_naive())
}

/// Validate an expiry date against an explicit reference date.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedExpiry`], [`ValidationError::InvalidExpiryMonth`],
/// or [`ValidationError::CardExpired`].
pub fn validate_expiry_date_at(value: &str, today: NaiveDate) -> Result<(), ValidationError> {
    let expiry = Expiry::parse(value)?;
    if expiry.is_before(today) {
        return Err(ValidationError::CardExpired);
    }
    Ok(())
}

/// Validate a CVV: three or four digits.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCvv`].
pub fn validate_cvv(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if (MIN_CVV_LEN..=MAX_CVV_LEN).contains(&len) && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCvv)
    }
}

/// Validate a cardholder name: not blank.
///
/// # Errors
///
/// Returns [`ValidationError::MissingCardholderName`].
pub fn validate_cardholder_name(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingCardholderName)
    } else {
        Ok(())
    }
}

// ============================================================================
// Field error collection
// ============================================================================

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// An empty set of errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a field check. Passing checks are ignored.
    pub fn check(&mut self, field: &str, result: Result<(), ValidationError>) {
        if let Err(e) = result {
            self.0.insert(field.to_string(), e.to_string());
        }
    }

    /// Fold another set of errors into this one.
    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    /// Message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when empty, otherwise the errors themselves.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Iterate over `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Validate a full set of card fields as entered in a card form.
#[must_use]
pub fn validate_card_fields(
    card_number: &str,
    card_name: &str,
    expiry_date: &str,
    cvv: &str,
    today: NaiveDate,
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check("cardNumber", validate_card_number(card_number));
    errors.check("cardName", validate_cardholder_name(card_name));
    errors.check("expiryDate", validate_expiry_date_at(expiry_date, today));
    errors.check("cvv", validate_cvv(cvv));
    errors
}
