//! Order submission.
//!
//! [`OrderService`] turns a finished draft into a stored order. Payment goes
//! through a [`SimulatedGateway`] that approves every card except the ones it is
//! configured to decline or to hang on, which is enough to exercise every
//! failure path the checkout exposes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use esim_shop_core::{
    DraftOrder, MaskedPayment, Order, OrderId, OrderProcessor, OrderReceipt, PaymentInfo,
    SubmissionError, UserId,
};
use esim_shop_store::{PaymentMethodRepository, Store, StoreError};

use crate::config::ServiceConfig;

/// How many fresh order IDs to try when a generated one is already taken.
pub const ORDER_ID_ATTEMPTS: usize = 3;

// ============================================================================
// Gateway
// ============================================================================

/// Stand-in for a card processor.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    declined: HashSet<String>,
    timeouts: HashSet<String>,
}

impl SimulatedGateway {
    /// A gateway declining `declined` and timing out on `timeouts`.
    ///
    /// Numbers are compared with all whitespace removed.
    pub fn new<I, J>(declined: I, timeouts: J) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
    {
        Self {
            declined: declined.into_iter().map(|n| compact(n.as_ref())).collect(),
            timeouts: timeouts.into_iter().map(|n| compact(n.as_ref())).collect(),
        }
    }

    /// Authorize a charge on a typed card.
    ///
    /// # Errors
    ///
    /// Returns `Declined` or `GatewayTimeout` for configured card numbers.
    pub fn authorize(&self, card_number: &str) -> Result<(), SubmissionError> {
        let number = compact(card_number);
        if self.timeouts.contains(&number) {
            return Err(SubmissionError::GatewayTimeout);
        }
        if self.declined.contains(&number) {
            return Err(SubmissionError::Declined {
                reason: "Your card was declined".to_string(),
            });
        }
        Ok(())
    }
}

fn compact(card_number: &str) -> String {
    card_number.chars().filter(|c| !c.is_whitespace()).collect()
}

// ============================================================================
// Service
// ============================================================================

/// Places and looks up orders.
pub struct OrderService {
    store: Arc<dyn Store>,
    payment_methods: Arc<PaymentMethodRepository>,
    gateway: SimulatedGateway,
    latency: Duration,
    shutdown: watch::Sender<bool>,
}

impl OrderService {
    /// Create an order service.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        payment_methods: Arc<PaymentMethodRepository>,
        gateway: SimulatedGateway,
        latency: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            payment_methods,
            gateway,
            latency,
            shutdown,
        }
    }

    /// Create an order service configured from `config`.
    #[must_use]
    pub fn from_config(
        store: Arc<dyn Store>,
        payment_methods: Arc<PaymentMethodRepository>,
        config: &ServiceConfig,
    ) -> Self {
        Self::new(
            store,
            payment_methods,
            SimulatedGateway::new(&config.declined_card_numbers, &config.timeout_card_numbers),
            config.order_processing_latency(),
        )
    }

    /// Stop accepting orders; submissions waiting on the gateway fail with `Cancelled`.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// An [`OrderProcessor`] placing orders on behalf of `user_id`.
    #[must_use]
    pub fn processor_for(&self, user_id: UserId) -> UserOrderProcessor<'_> {
        UserOrderProcessor {
            service: self,
            user_id,
        }
    }

    /// Place an order for `user_id` from a validated draft.
    ///
    /// # Errors
    ///
    /// - `Declined` if the gateway declines the card or the saved method is gone.
    /// - `GatewayTimeout` if the gateway does not answer.
    /// - `Cancelled` if the service shuts down while the order is in flight.
    /// - `Unavailable` if the order cannot be stored.
    pub async fn process_order(
        &self,
        user_id: UserId,
        draft: &DraftOrder,
    ) -> Result<OrderReceipt, SubmissionError> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return Err(SubmissionError::Cancelled);
        }

        tokio::select! {
            () = tokio::time::sleep(self.latency) => {}
            _ = shutdown.changed() => {
                tracing::warn!(user_id = %user_id, "Order submission cancelled by shutdown");
                return Err(SubmissionError::Cancelled);
            }
        }

        let payment_info = self.charge(user_id, &draft.payment_info)?;
        let order = self.store_order(user_id, draft, payment_info)?;

        tracing::info!(
            user_id = %user_id,
            order_id = %order.order_id,
            plan_id = %order.plan.id,
            total_cents = order.totals.total_cents,
            "Order placed"
        );
        Ok(order.receipt())
    }

    /// Look up an order placed by `user_id`.
    ///
    /// Orders belonging to other users are reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_order_details(
        &self,
        user_id: UserId,
        order_id: &OrderId,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .store
            .get_order(order_id)?
            .filter(|order| order.user_id == user_id))
    }

    /// Store a new order under a freshly generated ID, regenerating on a clash.
    fn store_order(
        &self,
        user_id: UserId,
        draft: &DraftOrder,
        payment_info: MaskedPayment,
    ) -> Result<Order, SubmissionError> {
        let placed_at = Utc::now();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let order = Order::from_draft(
                OrderId::generate(),
                user_id,
                draft,
                payment_info.clone(),
                placed_at,
            );
            match self.store.insert_order(&order) {
                Ok(()) => return Ok(order),
                Err(StoreError::OrderExists { id }) if attempts < ORDER_ID_ATTEMPTS => {
                    tracing::warn!(user_id = %user_id, order_id = %id, "Order ID taken, regenerating");
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Failed to store order");
                    return Err(SubmissionError::Unavailable(e.to_string()));
                }
            }
        }
    }

    fn charge(
        &self,
        user_id: UserId,
        payment_info: &PaymentInfo,
    ) -> Result<MaskedPayment, SubmissionError> {
        match payment_info {
            PaymentInfo::Inline(card) => {
                self.gateway.authorize(&card.card_number)?;
                Ok(MaskedPayment::from_inline(card))
            }
            PaymentInfo::Saved { method_id } => {
                let method = self
                    .payment_methods
                    .get_by_id(&user_id, method_id)
                    .map_err(|e| SubmissionError::Unavailable(e.to_string()))?
                    .ok_or_else(|| SubmissionError::Declined {
                        reason: "Saved payment method not found".to_string(),
                    })?;
                Ok(MaskedPayment::from_saved(&method))
            }
        }
    }
}

/// [`OrderService`] bound to one shopper.
pub struct UserOrderProcessor<'a> {
    service: &'a OrderService,
    user_id: UserId,
}

#[async_trait]
impl OrderProcessor for UserOrderProcessor<'_> {
    async fn process_order(&self, draft: &DraftOrder) -> Result<OrderReceipt, SubmissionError> {
        self.service.process_order(self.user_id, draft).await
    }
}

#[cfg(test)]
mod tests {
    use esim_shop_core::{
        CheckoutWizard, CustomerInfoPatch, NewPaymentMethod, PaymentInfoPatch, PlanCatalog,
        SectionPatch,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    use esim_shop_store::{MemoryStore, RepositoryOptions, StoredPaymentMethods};

    use super::*;

    /// Reports the next `clashes` order inserts as taken IDs.
    struct ClashingStore {
        inner: MemoryStore,
        clashes: AtomicUsize,
    }

    impl ClashingStore {
        fn new(clashes: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                clashes: AtomicUsize::new(clashes),
            }
        }
    }

    impl Store for ClashingStore {
        fn get_payment_methods(
            &self,
            user_id: &UserId,
        ) -> esim_shop_store::Result<Option<StoredPaymentMethods>> {
            self.inner.get_payment_methods(user_id)
        }
        fn put_payment_methods(
            &self,
            user_id: &UserId,
            record: &StoredPaymentMethods,
        ) -> esim_shop_store::Result<()> {
            self.inner.put_payment_methods(user_id, record)
        }
        fn insert_order(&self, order: &Order) -> esim_shop_store::Result<()> {
            let clashed = self
                .clashes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if clashed {
                return Err(StoreError::OrderExists {
                    id: order.order_id.to_string(),
                });
            }
            self.inner.insert_order(order)
        }
        fn get_order(&self, order_id: &OrderId) -> esim_shop_store::Result<Option<Order>> {
            self.inner.get_order(order_id)
        }
    }

    fn service(latency: Duration) -> OrderService {
        service_on(Arc::new(MemoryStore::new()), latency)
    }

    fn service_on(store: Arc<dyn Store>, latency: Duration) -> OrderService {
        let repo = Arc::new(PaymentMethodRepository::new(
            store.clone(),
            RepositoryOptions::default(),
        ));
        OrderService::new(
            store,
            repo,
            SimulatedGateway::new(["4000 0000 0000 0002"], ["4000000000000119"]),
            latency,
        )
    }

    fn draft(card_number: &str) -> DraftOrder {
        let mut draft = DraftOrder::new(PlanCatalog::default().resolve(Some("japan-3gb")));
        draft.merge(SectionPatch::CustomerInfo(CustomerInfoPatch {
            first_name: Some("Jane".into()),
            last_name: Some("Roe".into()),
            email: Some("jane@example.com".into()),
            phone: Some("555-123-4567".into()),
        }));
        draft.merge(SectionPatch::PaymentInfo(PaymentInfoPatch::Inline {
            card_number: Some(card_number.into()),
            card_name: Some("Jane Roe".into()),
            expiry_date: Some("12/30".into()),
            cvv: Some("123".into()),
        }));
        draft
    }

    #[test]
    fn gateway_ignores_spacing() {
        let gateway = SimulatedGateway::new(["4000000000000002"], Vec::<String>::new());
        assert!(gateway.authorize("4000 0000 0000 0002").is_err());
        assert!(gateway.authorize("4242 4242 4242 4242").is_ok());
    }

    #[tokio::test]
    async fn placed_order_is_stored_masked() {
        let service = service(Duration::ZERO);
        let user_id = UserId::generate();

        let receipt = service
            .process_order(user_id, &draft("4242 4242 4242 4242"))
            .await
            .unwrap();

        let order = service
            .get_order_details(user_id, &receipt.order_id)
            .unwrap()
            .unwrap();
        assert_eq!(order.order_id, receipt.order_id);
        assert_eq!(order.totals.total_cents, 2199);
        assert_eq!(order.payment_info.last_four(), "4242");
        let json = serde_json::to_string(&order).unwrap();
        assert!(!json.contains("4242 4242 4242 4242"));
        assert!(!json.contains("\"123\""));
    }

    #[tokio::test]
    async fn taken_order_id_is_regenerated() {
        let service = service_on(Arc::new(ClashingStore::new(1)), Duration::ZERO);
        let user_id = UserId::generate();

        let receipt = service
            .process_order(user_id, &draft("4242 4242 4242 4242"))
            .await
            .unwrap();

        assert!(service
            .get_order_details(user_id, &receipt.order_id)
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn persistent_id_clashes_fail_the_submission() {
        let service = service_on(
            Arc::new(ClashingStore::new(ORDER_ID_ATTEMPTS)),
            Duration::ZERO,
        );

        let result = service
            .process_order(UserId::generate(), &draft("4242 4242 4242 4242"))
            .await;

        assert!(matches!(result, Err(SubmissionError::Unavailable(_))));
    }

    #[tokio::test]
    async fn orders_are_private_to_their_user() {
        let service = service(Duration::ZERO);
        let receipt = service
            .process_order(UserId::generate(), &draft("4242 4242 4242 4242"))
            .await
            .unwrap();

        let other = service
            .get_order_details(UserId::generate(), &receipt.order_id)
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn configured_cards_fail() {
        let service = service(Duration::ZERO);
        let user_id = UserId::generate();

        let declined = service
            .process_order(user_id, &draft("4000000000000002"))
            .await;
        assert!(matches!(declined, Err(SubmissionError::Declined { .. })));

        let timeout = service
            .process_order(user_id, &draft("4000 0000 0000 0119"))
            .await;
        assert_eq!(timeout, Err(SubmissionError::GatewayTimeout));
    }

    #[tokio::test]
    async fn saved_method_is_resolved() {
        let service = service(Duration::ZERO);
        let user_id = UserId::generate();
        let method = service
            .payment_methods
            .save(
                &user_id,
                NewPaymentMethod {
                    card_number: "5555 5555 5555 4444".into(),
                    card_name: "Jane Roe".into(),
                    expiry_date: "12/30".into(),
                    cvv: None,
                    make_default: true,
                },
            )
            .unwrap();

        let mut saved = draft("");
        saved.merge(SectionPatch::PaymentInfo(PaymentInfoPatch::UseSaved {
            method_id: method.id.clone(),
        }));
        let receipt = service.process_order(user_id, &saved).await.unwrap();

        let order = service
            .get_order_details(user_id, &receipt.order_id)
            .unwrap()
            .unwrap();
        assert!(matches!(
            order.payment_info,
            MaskedPayment::Saved { ref method_id, .. } if *method_id == method.id
        ));

        // Another user cannot charge it.
        let stolen = service.process_order(UserId::generate(), &saved).await;
        assert!(matches!(stolen, Err(SubmissionError::Declined { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_in_flight_submission() {
        let service = Arc::new(service(Duration::from_secs(60)));
        let user_id = UserId::generate();
        let mut wizard = CheckoutWizard::new(user_id, PlanCatalog::default().resolve(None));
        let ready = draft("4242 4242 4242 4242");
        wizard.merge_section(SectionPatch::CustomerInfo(CustomerInfoPatch {
            first_name: Some(ready.customer_info.first_name.clone()),
            last_name: Some(ready.customer_info.last_name.clone()),
            email: Some(ready.customer_info.email.clone()),
            phone: Some(ready.customer_info.phone.clone()),
        }));
        wizard.merge_section(SectionPatch::PaymentInfo(PaymentInfoPatch::Inline {
            card_number: Some("4242 4242 4242 4242".into()),
            card_name: Some("Jane Roe".into()),
            expiry_date: Some("12/30".into()),
            cvv: Some("123".into()),
        }));
        wizard.advance();
        wizard.advance();

        let stopper = service.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stopper.shutdown();
        });

        let today = Utc::now().date_naive();
        let processor = service.processor_for(user_id);
        let result = wizard.submit(&processor, today).await;

        assert!(matches!(
            result,
            Err(esim_shop_core::CheckoutError::Submission(SubmissionError::Cancelled))
        ));
        assert!(!wizard.is_submitting());
        assert!(!wizard.is_complete());
    }
}
