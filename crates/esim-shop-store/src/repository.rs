//! The saved payment method repository.
//!
//! Each user's methods are stored as one collection. Every mutation loads the
//! collection, applies the change through [`PaymentMethods`] and writes the
//! whole collection back, holding a repository-wide lock so that concurrent
//! mutations inside one process cannot lose each other's writes.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use esim_shop_core::{
    NewPaymentMethod, PaymentMethod, PaymentMethodId, PaymentMethodUpdate, PaymentMethods,
    ShopError, UserId,
};

use crate::error::{Result, StoreError};
use crate::record::StoredPaymentMethods;
use crate::Store;

/// Default lifetime of a stored collection, refreshed on every write.
pub const DEFAULT_PAYMENT_METHOD_TTL_DAYS: i64 = 30;

/// Repository behaviour switches.
#[derive(Debug, Clone)]
pub struct RepositoryOptions {
    /// Seed two demo cards when a user's collection is empty on listing.
    pub seed_demo_methods: bool,
    /// How long a collection lives after its last write.
    pub ttl: Duration,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            seed_demo_methods: false,
            ttl: Duration::days(DEFAULT_PAYMENT_METHOD_TTL_DAYS),
        }
    }
}

/// Saved payment methods per user, over any [`Store`].
pub struct PaymentMethodRepository {
    store: Arc<dyn Store>,
    options: RepositoryOptions,
    write_lock: Mutex<()>,
}

impl PaymentMethodRepository {
    /// Create a repository over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, options: RepositoryOptions) -> Self {
        Self {
            store,
            options,
            write_lock: Mutex::new(()),
        }
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    /// All of a user's methods, most recently added first.
    ///
    /// With demo seeding enabled, an empty collection is replaced by the demo
    /// cards, which are persisted before being returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn list(&self, user_id: &UserId) -> Result<PaymentMethods> {
        let methods = self.load(user_id, Utc::now())?;
        if !methods.is_empty() || !self.options.seed_demo_methods {
            return Ok(methods);
        }

        let _guard = self.lock();
        let now = Utc::now();
        let methods = self.load(user_id, now)?;
        if !methods.is_empty() {
            return Ok(methods);
        }

        let demo = PaymentMethods::demo();
        self.persist(user_id, &demo, now)?;
        tracing::info!(user_id = %user_id, "Seeded demo payment methods");
        Ok(demo)
    }

    /// Look one method up.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_by_id(&self, user_id: &UserId, id: &PaymentMethodId) -> Result<Option<PaymentMethod>> {
        Ok(self.load(user_id, Utc::now())?.get(id).cloned())
    }

    /// Save a new card and return the stored method.
    ///
    /// Callers validate the input first; the full card number is not persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn save(&self, user_id: &UserId, input: NewPaymentMethod) -> Result<PaymentMethod> {
        let _guard = self.lock();
        let now = Utc::now();
        let mut methods = self.load(user_id, now)?;
        let method = methods.save(input);
        self.persist(user_id, &methods, now)?;

        tracing::info!(
            user_id = %user_id,
            payment_method_id = %method.id,
            card_type = %method.card_type,
            is_default = method.is_default,
            "Payment method saved"
        );
        Ok(method)
    }

    /// Edit a saved card and return it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PaymentMethodNotFound` if the user has no method with
    /// that id, or an error if the store cannot be read or written.
    pub fn update(&self, user_id: &UserId, input: PaymentMethodUpdate) -> Result<PaymentMethod> {
        let _guard = self.lock();
        let now = Utc::now();
        let mut methods = self.load(user_id, now)?;
        let method = methods.update(input).map_err(|e| match e {
            ShopError::PaymentMethodNotFound { id } => StoreError::PaymentMethodNotFound { id },
            other => StoreError::Database(other.to_string()),
        })?;
        self.persist(user_id, &methods, now)?;

        tracing::info!(
            user_id = %user_id,
            payment_method_id = %method.id,
            is_default = method.is_default,
            "Payment method updated"
        );
        Ok(method)
    }

    /// Remove a card. Removing an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn delete(&self, user_id: &UserId, id: &PaymentMethodId) -> Result<()> {
        let _guard = self.lock();
        let now = Utc::now();
        let mut methods = self.load(user_id, now)?;
        if let Some(removed) = methods.remove(id) {
            self.persist(user_id, &methods, now)?;
            tracing::info!(
                user_id = %user_id,
                payment_method_id = %removed.id,
                was_default = removed.is_default,
                "Payment method deleted"
            );
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a collection; corrupt or expired records read as empty.
    fn load(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<PaymentMethods> {
        match self.store.get_payment_methods(user_id) {
            Ok(Some(record)) if record.is_expired(now) => {
                tracing::debug!(user_id = %user_id, expires_at = %record.expires_at, "Payment methods expired");
                Ok(PaymentMethods::new())
            }
            Ok(Some(record)) => Ok(record.methods),
            Ok(None) => Ok(PaymentMethods::new()),
            Err(StoreError::Serialization(e)) => {
                tracing::warn!(user_id = %user_id, error = %e, "Unreadable payment methods, treating as empty");
                Ok(PaymentMethods::new())
            }
            Err(e) => Err(e),
        }
    }

    fn persist(&self, user_id: &UserId, methods: &PaymentMethods, now: DateTime<Utc>) -> Result<()> {
        let record = StoredPaymentMethods::new(methods.clone(), now, self.options.ttl);
        self.store.put_payment_methods(user_id, &record)
    }
}

#[cfg(test)]
mod tests {
    use esim_shop_core::{CardType, Order, OrderId};

    use super::*;
    use crate::MemoryStore;

    fn repo() -> PaymentMethodRepository {
        PaymentMethodRepository::new(Arc::new(MemoryStore::new()), RepositoryOptions::default())
    }

    fn card(number: &str, make_default: bool) -> NewPaymentMethod {
        NewPaymentMethod {
            card_number: number.into(),
            card_name: "Jane Roe".into(),
            expiry_date: "12/30".into(),
            cvv: Some("123".into()),
            make_default,
        }
    }

    /// A store whose payment method records can never be decoded.
    struct UnreadableStore;

    impl Store for UnreadableStore {
        fn get_payment_methods(&self, _: &UserId) -> Result<Option<StoredPaymentMethods>> {
            Err(StoreError::Serialization("unexpected end of input".into()))
        }
        fn put_payment_methods(&self, _: &UserId, _: &StoredPaymentMethods) -> Result<()> {
            Ok(())
        }
        fn insert_order(&self, _: &Order) -> Result<()> {
            Ok(())
        }
        fn get_order(&self, _: &OrderId) -> Result<Option<Order>> {
            Ok(None)
        }
    }

    #[test]
    fn new_user_has_no_methods() {
        let repo = repo();
        assert!(repo.list(&UserId::generate()).unwrap().is_empty());
    }

    #[test]
    fn seeding_creates_demo_cards_once() {
        let repo = PaymentMethodRepository::new(
            Arc::new(MemoryStore::new()),
            RepositoryOptions {
                seed_demo_methods: true,
                ..RepositoryOptions::default()
            },
        );
        let user_id = UserId::generate();

        let first = repo.list(&user_id).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.as_slice()[0].last_four, "4242");
        assert!(first.as_slice()[0].is_default);
        assert_eq!(first.as_slice()[1].card_type, CardType::Mastercard);

        let second = repo.list(&user_id).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn save_keeps_newest_first_and_one_default() {
        let repo = repo();
        let user_id = UserId::generate();

        let visa = repo.save(&user_id, card("4242 4242 4242 4242", true)).unwrap();
        let amex = repo.save(&user_id, card("3782 822463 10005", false)).unwrap();
        let mc = repo.save(&user_id, card("5555 5555 5555 4444", true)).unwrap();

        let methods = repo.list(&user_id).unwrap();
        let ids: Vec<_> = methods.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![mc.id.clone(), amex.id, visa.id.clone()]);
        assert_eq!(methods.default_count(), 1);
        assert_eq!(methods.default_method().unwrap().id, mc.id);
        assert!(!repo.get_by_id(&user_id, &visa.id).unwrap().unwrap().is_default);
    }

    #[test]
    fn update_unknown_method_is_not_found() {
        let repo = repo();
        let result = repo.update(
            &UserId::generate(),
            PaymentMethodUpdate {
                id: PaymentMethodId::generate(),
                card_name: "Jane".into(),
                expiry_date: "12/30".into(),
                make_default: false,
                card_number: None,
                cvv: None,
            },
        );
        assert!(matches!(result, Err(StoreError::PaymentMethodNotFound { .. })));
    }

    #[test]
    fn update_moves_default() {
        let repo = repo();
        let user_id = UserId::generate();
        let visa = repo.save(&user_id, card("4242 4242 4242 4242", true)).unwrap();
        let mc = repo.save(&user_id, card("5555 5555 5555 4444", false)).unwrap();

        let updated = repo
            .update(
                &user_id,
                PaymentMethodUpdate {
                    id: mc.id.clone(),
                    card_name: "J. Roe".into(),
                    expiry_date: "11/31".into(),
                    make_default: true,
                    card_number: None,
                    cvv: None,
                },
            )
            .unwrap();

        assert!(updated.is_default);
        assert_eq!(updated.cardholder_name, "J. Roe");
        assert_eq!(updated.last_four, "4444");
        let visa = repo.get_by_id(&user_id, &visa.id).unwrap().unwrap();
        assert!(!visa.is_default);
        assert_eq!(repo.list(&user_id).unwrap().default_count(), 1);
    }

    #[test]
    fn delete_promotes_first_remaining() {
        let repo = repo();
        let user_id = UserId::generate();
        let visa = repo.save(&user_id, card("4242 4242 4242 4242", true)).unwrap();
        let mc = repo.save(&user_id, card("5555 5555 5555 4444", false)).unwrap();

        repo.delete(&user_id, &visa.id).unwrap();

        let methods = repo.list(&user_id).unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods.default_method().unwrap().id, mc.id);

        // Unknown ids are ignored.
        repo.delete(&user_id, &PaymentMethodId::generate()).unwrap();
        assert_eq!(repo.list(&user_id).unwrap().len(), 1);
    }

    #[test]
    fn expired_collection_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        let user_id = UserId::generate();
        let stale = StoredPaymentMethods::new(
            PaymentMethods::demo(),
            Utc::now() - Duration::days(31),
            Duration::days(30),
        );
        store.put_payment_methods(&user_id, &stale).unwrap();

        let repo = PaymentMethodRepository::new(store, RepositoryOptions::default());
        assert!(repo.list(&user_id).unwrap().is_empty());
    }

    #[test]
    fn writes_refresh_expiry() {
        let store = Arc::new(MemoryStore::new());
        let repo = PaymentMethodRepository::new(store.clone(), RepositoryOptions::default());
        let user_id = UserId::generate();

        repo.save(&user_id, card("4242 4242 4242 4242", false)).unwrap();

        let record = store.get_payment_methods(&user_id).unwrap().unwrap();
        let remaining = record.expires_at - Utc::now();
        assert!(remaining > Duration::days(29));
        assert!(remaining <= Duration::days(30));
    }

    #[test]
    fn unreadable_collection_reads_as_empty() {
        let repo = PaymentMethodRepository::new(Arc::new(UnreadableStore), RepositoryOptions::default());
        let user_id = UserId::generate();

        assert!(repo.list(&user_id).unwrap().is_empty());
        let saved = repo.save(&user_id, card("6011 1111 1111 1117", false)).unwrap();
        assert_eq!(saved.card_type, CardType::Discover);
    }

    #[test]
    fn full_card_number_is_never_stored() {
        let store = Arc::new(MemoryStore::new());
        let repo = PaymentMethodRepository::new(store.clone(), RepositoryOptions::default());
        let user_id = UserId::generate();

        repo.save(&user_id, card("4242 4242 4242 4242", false)).unwrap();

        let record = store.get_payment_methods(&user_id).unwrap().unwrap();
        let debug = format!("{record:?}");
        assert!(!debug.contains("4242 4242"));
        assert!(!debug.contains("4242424242424242"));
    }
}
