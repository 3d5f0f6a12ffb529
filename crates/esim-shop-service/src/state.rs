//! Application state.

use std::sync::Arc;

use chrono::Duration;

use esim_shop_core::PlanCatalog;
use esim_shop_store::{PaymentMethodRepository, RepositoryOptions, Store};

use crate::config::ServiceConfig;
use crate::orders::OrderService;
use crate::sessions::CheckoutSessions;

/// Application state shared across handlers.
pub struct AppState {
    /// Service configuration.
    pub config: ServiceConfig,

    /// Plans available for checkout.
    pub catalog: PlanCatalog,

    /// Saved payment methods.
    pub payment_methods: Arc<PaymentMethodRepository>,

    /// Order placement and lookup.
    pub orders: Arc<OrderService>,

    /// Checkouts in progress.
    pub checkouts: CheckoutSessions,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let options = RepositoryOptions {
            seed_demo_methods: config.seed_demo_payment_methods,
            ttl: Duration::days(config.payment_method_ttl_days),
        };
        if options.seed_demo_methods {
            tracing::info!("Demo payment methods will be seeded for new sessions");
        }

        let payment_methods = Arc::new(PaymentMethodRepository::new(store.clone(), options));
        let orders = Arc::new(OrderService::from_config(
            store,
            payment_methods.clone(),
            &config,
        ));

        Self {
            config,
            catalog: PlanCatalog::default(),
            payment_methods,
            orders,
            checkouts: CheckoutSessions::new(),
        }
    }
}
