//! In-memory storage implementation.
//!
//! Values are CBOR-encoded exactly as the `RocksDB` backend stores them, so the
//! two backends behave the same apart from durability.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use esim_shop_core::{Order, OrderId, UserId};

use crate::codec;
use crate::error::{Result, StoreError};
use crate::keys;
use crate::record::StoredPaymentMethods;
use crate::schema::cf;
use crate::Store;

type Table = HashMap<Vec<u8>, Vec<u8>>;

/// Process-local storage backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, table: &'static str, key: &[u8]) -> Option<Vec<u8>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.get(table).and_then(|t| t.get(key)).cloned()
    }

    fn put(&self, table: &'static str, key: Vec<u8>, value: Vec<u8>) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.entry(table).or_default().insert(key, value);
    }

    /// Store `value` unless `key` is taken; returns whether it was stored.
    fn insert_new(&self, table: &'static str, key: Vec<u8>, value: Vec<u8>) -> bool {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        match tables.entry(table).or_default().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }
}

impl Store for MemoryStore {
    fn get_payment_methods(&self, user_id: &UserId) -> Result<Option<StoredPaymentMethods>> {
        self.get(cf::PAYMENT_METHODS, &keys::payment_methods_key(user_id))
            .map(|data| codec::deserialize(&data))
            .transpose()
    }

    fn put_payment_methods(&self, user_id: &UserId, record: &StoredPaymentMethods) -> Result<()> {
        let value = codec::serialize(record)?;
        self.put(cf::PAYMENT_METHODS, keys::payment_methods_key(user_id), value);
        Ok(())
    }

    fn insert_order(&self, order: &Order) -> Result<()> {
        let value = codec::serialize(order)?;
        if self.insert_new(cf::ORDERS, keys::order_key(&order.order_id), value) {
            Ok(())
        } else {
            Err(StoreError::OrderExists {
                id: order.order_id.to_string(),
            })
        }
    }

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.get(cf::ORDERS, &keys::order_key(order_id))
            .map(|data| codec::deserialize(&data))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use esim_shop_core::{CustomerInfo, DraftOrder, MaskedPayment, PaymentMethods, PlanCatalog};

    use super::*;

    #[test]
    fn payment_methods_crud() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        assert!(store.get_payment_methods(&user_id).unwrap().is_none());

        let record = StoredPaymentMethods::new(PaymentMethods::demo(), Utc::now(), Duration::days(30));
        store.put_payment_methods(&user_id, &record).unwrap();
        assert_eq!(store.get_payment_methods(&user_id).unwrap(), Some(record.clone()));

        // Saving again replaces the collection.
        let emptied = StoredPaymentMethods::new(PaymentMethods::default(), Utc::now(), Duration::days(30));
        store.put_payment_methods(&user_id, &emptied).unwrap();
        assert_eq!(store.get_payment_methods(&user_id).unwrap(), Some(emptied));
    }

    fn order_for(user_id: UserId) -> Order {
        let mut draft = DraftOrder::new(PlanCatalog::default().resolve(Some("us-5gb")));
        draft.customer_info = CustomerInfo {
            first_name: "Jane".into(),
            ..CustomerInfo::default()
        };
        Order::from_draft(
            OrderId::generate(),
            user_id,
            &draft,
            MaskedPayment::from_saved(&PaymentMethods::demo().as_slice()[0]),
            Utc::now(),
        )
    }

    #[test]
    fn orders_are_keyed_by_id() {
        let store = MemoryStore::new();
        let order = order_for(UserId::generate());

        store.insert_order(&order).unwrap();

        assert_eq!(store.get_order(&order.order_id).unwrap(), Some(order.clone()));
        assert!(store.get_order(&OrderId::generate()).unwrap().is_none());
    }

    #[test]
    fn taken_order_id_is_not_overwritten() {
        let store = MemoryStore::new();
        let order = order_for(UserId::generate());
        store.insert_order(&order).unwrap();

        let mut other = order_for(UserId::generate());
        other.order_id = order.order_id.clone();
        let result = store.insert_order(&other);

        assert!(matches!(
            result,
            Err(StoreError::OrderExists { ref id }) if *id == order.order_id.to_string()
        ));
        assert_eq!(store.get_order(&order.order_id).unwrap(), Some(order));
    }
}
