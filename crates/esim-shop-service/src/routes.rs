//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, patch, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{checkout, health, orders, payment_methods, plans, session};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/session` - Start an anonymous session
/// - `GET /v1/plans` - List plans
/// - `GET /v1/plans/:plan_id` - Resolve a plan
///
/// ## Payment methods (session)
/// - `GET /v1/payment-methods` - List saved cards
/// - `POST /v1/payment-methods` - Save a card
/// - `GET|PUT|DELETE /v1/payment-methods/:id` - Get, edit or remove a card
///
/// ## Checkout (session)
/// - `POST /v1/checkout` - Start a checkout
/// - `GET /v1/checkout/:id` - Checkout state
/// - `PATCH /v1/checkout/:id/customer-info` - Merge contact details
/// - `PATCH /v1/checkout/:id/payment-info` - Merge payment details
/// - `POST /v1/checkout/:id/advance` - Next step
/// - `POST /v1/checkout/:id/retreat` - Previous step
/// - `POST /v1/checkout/:id/submit` - Place the order
///
/// ## Orders (session)
/// - `GET /v1/orders/:order_id` - Order details
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Session
        .route("/session", post(session::create_session))
        // Plans
        .route("/plans", get(plans::list_plans))
        .route("/plans/:plan_id", get(plans::get_plan))
        // Payment methods
        .route(
            "/payment-methods",
            get(payment_methods::list_payment_methods)
                .post(payment_methods::create_payment_method),
        )
        .route(
            "/payment-methods/:id",
            get(payment_methods::get_payment_method)
                .put(payment_methods::update_payment_method)
                .delete(payment_methods::delete_payment_method),
        )
        // Checkout
        .route("/checkout", post(checkout::start_checkout))
        .route("/checkout/:id", get(checkout::get_checkout))
        .route(
            "/checkout/:id/customer-info",
            patch(checkout::update_customer_info),
        )
        .route(
            "/checkout/:id/payment-info",
            patch(checkout::update_payment_info),
        )
        .route("/checkout/:id/advance", post(checkout::advance))
        .route("/checkout/:id/retreat", post(checkout::retreat))
        .route("/checkout/:id/submit", post(checkout::submit))
        // Orders
        .route("/orders/:order_id", get(orders::get_order))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
