//! Key encoding for stored records.

use esim_shop_core::{OrderId, UserId};

/// Key of a user's payment method collection.
#[must_use]
pub fn payment_methods_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Key of an order.
///
/// Order ids are already unique and printable, so the key is the id itself.
#[must_use]
pub fn order_key(order_id: &OrderId) -> Vec<u8> {
    order_id.as_str().as_bytes().to_vec()
}
