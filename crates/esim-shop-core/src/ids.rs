//! Identifier types for the eSIM shop.
//!
//! This module provides strongly-typed identifiers for sessions, checkouts,
//! saved payment methods, and orders.
//!
//! # Macro-based ID Types
//!
//! The `uuid_id_type!` macro reduces boilerplate for UUID-based identifier types,
//! ensuring consistent implementation of serialization, parsing, and display traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Prefix carried by every saved payment method identifier.
pub const PAYMENT_METHOD_ID_PREFIX: &str = "pm_";

/// Prefix carried by every order identifier.
pub const ORDER_ID_PREFIX: &str = "ORD-";

/// Number of characters following [`ORDER_ID_PREFIX`].
pub const ORDER_ID_SUFFIX_LEN: usize = 8;

/// Macro to define a UUID-based identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `uuid::Uuid` with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `Serialize`, `Deserialize` (as string)
/// - `FromStr`, `Display`, `Debug`
/// - `TryFrom<String>`, `Into<String>`
macro_rules! uuid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Return the bytes of the UUID (16 bytes).
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

uuid_id_type!(UserId, "A shopper identifier (UUID format).\n\nCarried by the session header or cookie; every saved payment method and order belongs to one.");
uuid_id_type!(CheckoutId, "A checkout wizard identifier (UUID format).");

/// An opaque saved payment method identifier (`pm_` followed by a lowercase ULID).
///
/// Identifiers generated here are time-ordered, but any non-empty string read back
/// from storage is accepted so previously issued identifiers stay valid.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentMethodId(String);

impl PaymentMethodId {
    /// Generate a new payment method identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{PAYMENT_METHOD_ID_PREFIX}{}",
            Ulid::new().to_string().to_lowercase()
        ))
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PaymentMethodId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Debug for PaymentMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentMethodId({})", self.0)
    }
}

impl fmt::Display for PaymentMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PaymentMethodId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentMethodId> for String {
    fn from(id: PaymentMethodId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for PaymentMethodId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// An order identifier: `ORD-` followed by 8 uppercase alphanumeric characters.
///
/// The suffix is taken from the random component of a fresh ULID, which uses the
/// Crockford base32 alphabet and is therefore uppercase alphanumeric.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    /// Generate a new order identifier.
    #[must_use]
    pub fn generate() -> Self {
        let ulid = Ulid::new().to_string();
        let suffix = &ulid[ulid.len() - ORDER_ID_SUFFIX_LEN..];
        Self(format!("{ORDER_ID_PREFIX}{suffix}"))
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 8-character fragment after the `ORD-` prefix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.0[ORDER_ID_PREFIX.len()..]
    }
}

impl FromStr for OrderId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let suffix = s.strip_prefix(ORDER_ID_PREFIX).ok_or(IdError::InvalidOrderId)?;
        let well_formed = suffix.len() == ORDER_ID_SUFFIX_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase());
        if !well_formed {
            return Err(IdError::InvalidOrderId);
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderId({})", self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for OrderId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not an `ORD-XXXXXXXX` order identifier.
    #[error("invalid order identifier")]
    InvalidOrderId,

    /// The input is empty.
    #[error("identifier must not be empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrip() {
        let id = UserId::generate();
        let parsed = UserId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn user_id_rejects_garbage() {
        assert_eq!(UserId::from_str("not-a-uuid"), Err(IdError::InvalidUuid));
    }

    #[test]
    fn payment_method_id_has_prefix() {
        let id = PaymentMethodId::generate();
        assert!(id.as_str().starts_with("pm_"));
        assert_eq!(id.as_str().len(), 3 + 26);
        assert_ne!(id, PaymentMethodId::generate());
    }

    #[test]
    fn payment_method_id_rejects_empty() {
        assert_eq!(PaymentMethodId::from_str("  "), Err(IdError::Empty));
    }

    #[test]
    fn order_id_format() {
        for _ in 0..64 {
            let id = OrderId::generate();
            assert!(id.as_str().starts_with("ORD-"));
            assert_eq!(id.suffix().len(), 8);
            assert!(id
                .suffix()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
            assert_eq!(OrderId::from_str(id.as_str()).unwrap(), id);
        }
    }

    #[test]
    fn order_id_parse_rejects_malformed() {
        assert!(OrderId::from_str("ORD-abc12345").is_err());
        assert!(OrderId::from_str("ORD-1234567").is_err());
        assert!(OrderId::from_str("ABC-12345678").is_err());
        assert!(OrderId::from_str("ORD-12AB34CD").is_ok());
    }

    #[test]
    fn order_id_serde_json() {
        let id = OrderId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
        assert!(serde_json::from_str::<OrderId>("\"ORD-x\"").is_err());
    }
}
