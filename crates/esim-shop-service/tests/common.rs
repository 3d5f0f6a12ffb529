//! Common test utilities for esim-shop integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use esim_shop_core::UserId;
use esim_shop_service::{create_router, AppState, ServiceConfig, StorageBackend};
use esim_shop_store::RocksStore;

/// Card number approved by the simulated gateway.
pub const GOOD_CARD: &str = "4242 4242 4242 4242";

/// Card number declined by the simulated gateway.
pub const DECLINED_CARD: &str = "4000 0000 0000 0002";

/// Card number the simulated gateway times out on.
pub const TIMEOUT_CARD: &str = "4000 0000 0000 0119";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// The session used for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and no order latency.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness after adjusting the test configuration.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            storage_backend: StorageBackend::RocksDb,
            order_processing_latency_ms: 0,
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            test_user_id: UserId::generate(),
        }
    }

    /// The session header value for the test user.
    pub fn session(&self) -> String {
        self.test_user_id.to_string()
    }

    /// A fresh session (for testing isolation).
    pub fn other_session() -> String {
        UserId::generate().to_string()
    }

    /// Save a card for the test user and return the response body.
    pub async fn save_card(&self, card_number: &str, make_default: bool) -> Value {
        let response = self
            .server
            .post("/v1/payment-methods")
            .add_header("x-session-id", self.session())
            .json(&json!({
                "cardNumber": card_number,
                "cardName": "Jane Roe",
                "expiryDate": "12/30",
                "cvv": "123",
                "makeDefault": make_default,
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }

    /// Start a checkout for `plan_id` and return its id.
    pub async fn start_checkout(&self, plan_id: Option<&str>) -> String {
        let response = self
            .server
            .post("/v1/checkout")
            .add_header("x-session-id", self.session())
            .json(&json!({ "planId": plan_id }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        body["id"].as_str().expect("checkout id").to_string()
    }

    /// Fill both sections with valid data paying by `card_number` and move to review.
    pub async fn ready_checkout(&self, card_number: &str) -> String {
        let id = self.start_checkout(Some("japan-3gb")).await;

        self.server
            .patch(&format!("/v1/checkout/{id}/customer-info"))
            .add_header("x-session-id", self.session())
            .json(&json!({
                "firstName": "Jane",
                "lastName": "Roe",
                "email": "jane@example.com",
                "phone": "555-123-4567",
            }))
            .await
            .assert_status_ok();

        self.server
            .patch(&format!("/v1/checkout/{id}/payment-info"))
            .add_header("x-session-id", self.session())
            .json(&json!({
                "kind": "inline",
                "cardNumber": card_number,
                "cardName": "Jane Roe",
                "expiryDate": "12/30",
                "cvv": "123",
            }))
            .await
            .assert_status_ok();

        for _ in 0..2 {
            self.server
                .post(&format!("/v1/checkout/{id}/advance"))
                .add_header("x-session-id", self.session())
                .await
                .assert_status_ok();
        }

        id
    }

    /// Submit a checkout.
    pub async fn submit(&self, id: &str) -> TestResponse {
        self.server
            .post(&format!("/v1/checkout/{id}/submit"))
            .add_header("x-session-id", self.session())
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
