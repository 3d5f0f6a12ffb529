//! Customer contact details collected in the first checkout step.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::card::{FieldErrors, ValidationError};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+]?[(]?[0-9]{3}[)]?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4,6}$")
        .expect("valid phone regex")
});

/// Contact details for the person placing the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email the eSIM QR code is sent to.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
}

/// A partial update to [`CustomerInfo`]; only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfoPatch {
    /// New given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// New email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl CustomerInfo {
    /// Shallow-merge a patch, keeping fields the patch leaves unset.
    pub fn apply(&mut self, patch: CustomerInfoPatch) {
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
    }

    /// Validate every field, keyed by its camelCase name.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.check("firstName", validate_required(&self.first_name));
        errors.check("lastName", validate_required(&self.last_name));
        errors.check("email", validate_email(&self.email));
        errors.check("phone", validate_phone(&self.phone));
        errors
    }
}

/// A required text field must not be blank.
///
/// # Errors
///
/// Returns [`ValidationError::Required`].
pub fn validate_required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required)
    } else {
        Ok(())
    }
}

/// Loose email shape check: `local@domain.tld`, no whitespace.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmail`].
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    if EMAIL_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// Phone numbers grouped 3-3-4..6 digits, e.g. `(555) 123-4567` or `+555.123.4567`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidPhone`].
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}
