//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options};

use esim_shop_core::{Order, OrderId, UserId};

use crate::codec;
use crate::error::{Result, StoreError};
use crate::keys;
use crate::record::StoredPaymentMethods;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes the exists-check and write of order inserts.
    order_writes: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!("RocksDB store opened");
        Ok(Self {
            db: Arc::new(db),
            order_writes: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn read<T: serde::de::DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| codec::deserialize(&data))
            .transpose()
    }

    fn contains(&self, name: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf(name)?;
        self.db
            .get_pinned_cf(&cf, key)
            .map(|value| value.is_some())
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn write<T: serde::Serialize>(&self, name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(name)?;
        let value = codec::serialize(value)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Payment Method Operations
    // =========================================================================

    fn get_payment_methods(&self, user_id: &UserId) -> Result<Option<StoredPaymentMethods>> {
        self.read(cf::PAYMENT_METHODS, &keys::payment_methods_key(user_id))
    }

    fn put_payment_methods(&self, user_id: &UserId, record: &StoredPaymentMethods) -> Result<()> {
        self.write(cf::PAYMENT_METHODS, &keys::payment_methods_key(user_id), record)
    }

    // =========================================================================
    // Order Operations
    // =========================================================================

    fn insert_order(&self, order: &Order) -> Result<()> {
        let key = keys::order_key(&order.order_id);
        let _guard = self.order_writes.lock().unwrap_or_else(PoisonError::into_inner);
        if self.contains(cf::ORDERS, &key)? {
            return Err(StoreError::OrderExists {
                id: order.order_id.to_string(),
            });
        }
        self.write(cf::ORDERS, &key, order)
    }

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.read(cf::ORDERS, &keys::order_key(order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use esim_shop_core::{DraftOrder, InlineCard, MaskedPayment, PaymentMethods, PlanCatalog};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn payment_methods_crud() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let record = StoredPaymentMethods::new(PaymentMethods::demo(), Utc::now(), Duration::days(30));

        // Create
        store.put_payment_methods(&user_id, &record).unwrap();

        // Read
        let retrieved = store.get_payment_methods(&user_id).unwrap().unwrap();
        assert_eq!(retrieved, record);
        assert_eq!(retrieved.methods.default_count(), 1);

        // Other users see nothing
        assert!(store
            .get_payment_methods(&UserId::generate())
            .unwrap()
            .is_none());
    }

    #[test]
    fn corrupt_record_is_a_serialization_error() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        let cf = store.cf(cf::PAYMENT_METHODS).unwrap();
        store
            .db
            .put_cf(&cf, keys::payment_methods_key(&user_id), b"not cbor at all")
            .unwrap();

        let result = store.get_payment_methods(&user_id);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn order_roundtrip() {
        let (store, _dir) = create_test_store();
        let draft = DraftOrder::new(PlanCatalog::default().resolve(Some("global-10gb")));
        let card = InlineCard {
            card_number: "5555 5555 5555 4444".into(),
            card_name: "Jane Roe".into(),
            expiry_date: "01/31".into(),
            cvv: "999".into(),
        };
        let order = Order::from_draft(
            OrderId::generate(),
            UserId::generate(),
            &draft,
            MaskedPayment::from_inline(&card),
            Utc::now(),
        );

        store.insert_order(&order).unwrap();

        let retrieved = store.get_order(&order.order_id).unwrap().unwrap();
        assert_eq!(retrieved, order);
        assert_eq!(retrieved.payment_info.last_four(), "4444");
        assert_eq!(retrieved.totals.total_cents, 6599);

        // The same ID cannot be stored twice.
        let mut clash = order.clone();
        clash.user_id = UserId::generate();
        assert!(matches!(
            store.insert_order(&clash),
            Err(StoreError::OrderExists { .. })
        ));
        assert_eq!(store.get_order(&order.order_id).unwrap(), Some(order));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let user_id = UserId::generate();
        let record = StoredPaymentMethods::new(PaymentMethods::demo(), Utc::now(), Duration::days(30));

        {
            let store = RocksStore::open(dir.path()).unwrap();
            store.put_payment_methods(&user_id, &record).unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        assert_eq!(store.get_payment_methods(&user_id).unwrap(), Some(record));
    }
}
