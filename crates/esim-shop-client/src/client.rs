//! eSIM shop HTTP client implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};

use esim_shop_core::{
    CheckoutId, CustomerInfoPatch, NewPaymentMethod, OrderId, OrderReceipt, PaymentInfoPatch,
    PaymentMethod, PaymentMethodId,
};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, CheckoutState, DeleteResponse, HealthResponse, OrderDetails, PlanDetails,
    SessionResponse, StartCheckoutRequest, UpdatePaymentMethodRequest,
};

/// Header carrying the session id.
const SESSION_HEADER: &str = "x-session-id";

/// eSIM shop API client.
///
/// Plans and health are public. Everything else is scoped to the session set
/// with [`EsimShopClient::with_session`].
#[derive(Debug, Clone)]
pub struct EsimShopClient {
    client: Client,
    base_url: String,
    session_id: Option<String>,
}

impl EsimShopClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://esim-shop:8080"`)
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_id: options.session_id,
        })
    }

    /// Use `session_id` for session-scoped calls.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// The session in use, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    // ========================================================================
    // Public endpoints
    // ========================================================================

    /// Check service health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.client.get(format!("{}/health", self.base_url)).send().await?;
        self.handle_response(response).await
    }

    /// Ask the service for a new anonymous session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn create_session(&self) -> Result<SessionResponse, ClientError> {
        let response = self
            .client
            .post(format!("{}/v1/session", self.base_url))
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// List the plan catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_plans(&self) -> Result<Vec<PlanDetails>, ClientError> {
        let response = self
            .client
            .get(format!("{}/v1/plans", self.base_url))
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Resolve a plan; unknown ids come back as the fallback plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_plan(&self, plan_id: &str) -> Result<PlanDetails, ClientError> {
        let response = self
            .client
            .get(format!("{}/v1/plans/{plan_id}", self.base_url))
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ========================================================================
    // Payment methods
    // ========================================================================

    /// List saved cards, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is set, the request fails, or the server
    /// returns an error.
    pub async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, ClientError> {
        let response = self
            .request(Method::GET, "/v1/payment-methods")?
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Save a card.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] if the card form is rejected.
    pub async fn save_payment_method(
        &self,
        method: &NewPaymentMethod,
    ) -> Result<PaymentMethod, ClientError> {
        let response = self
            .request(Method::POST, "/v1/payment-methods")?
            .json(method)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Get one saved card.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the session has no such card.
    pub async fn get_payment_method(
        &self,
        id: &PaymentMethodId,
    ) -> Result<PaymentMethod, ClientError> {
        let response = self
            .request(Method::GET, &format!("/v1/payment-methods/{id}"))?
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Edit a saved card.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] or [`ClientError::Validation`].
    pub async fn update_payment_method(
        &self,
        id: &PaymentMethodId,
        update: &UpdatePaymentMethodRequest,
    ) -> Result<PaymentMethod, ClientError> {
        let response = self
            .request(Method::PUT, &format!("/v1/payment-methods/{id}"))?
            .json(update)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Remove a saved card. Removing an unknown card succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn delete_payment_method(
        &self,
        id: &PaymentMethodId,
    ) -> Result<DeleteResponse, ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/v1/payment-methods/{id}"))?
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ========================================================================
    // Checkout
    // ========================================================================

    /// Start a checkout for `plan_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn start_checkout(&self, plan_id: Option<&str>) -> Result<CheckoutState, ClientError> {
        let request = StartCheckoutRequest {
            plan_id: plan_id.map(str::to_string),
        };
        let response = self
            .request(Method::POST, "/v1/checkout")?
            .json(&request)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Fetch a checkout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the session has no such checkout.
    pub async fn get_checkout(&self, id: CheckoutId) -> Result<CheckoutState, ClientError> {
        let response = self
            .request(Method::GET, &format!("/v1/checkout/{id}"))?
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Merge contact details into a checkout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the session has no such checkout.
    pub async fn update_customer_info(
        &self,
        id: CheckoutId,
        patch: &CustomerInfoPatch,
    ) -> Result<CheckoutState, ClientError> {
        let response = self
            .request(Method::PATCH, &format!("/v1/checkout/{id}/customer-info"))?
            .json(patch)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Merge payment details into a checkout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the session has no such checkout.
    pub async fn update_payment_info(
        &self,
        id: CheckoutId,
        patch: &PaymentInfoPatch,
    ) -> Result<CheckoutState, ClientError> {
        let response = self
            .request(Method::PATCH, &format!("/v1/checkout/{id}/payment-info"))?
            .json(patch)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Move a checkout to its next step.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the session has no such checkout.
    pub async fn advance(&self, id: CheckoutId) -> Result<CheckoutState, ClientError> {
        let response = self
            .request(Method::POST, &format!("/v1/checkout/{id}/advance"))?
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Move a checkout to its previous step.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the session has no such checkout.
    pub async fn retreat(&self, id: CheckoutId) -> Result<CheckoutState, ClientError> {
        let response = self
            .request(Method::POST, &format!("/v1/checkout/{id}/retreat"))?
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Place the order.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Conflict`] if the checkout is not at review, is already
    ///   submitting, or was already placed.
    /// - [`ClientError::Validation`] if the draft is incomplete.
    /// - [`ClientError::Declined`] if the card was declined.
    pub async fn submit_checkout(&self, id: CheckoutId) -> Result<OrderReceipt, ClientError> {
        let response = self
            .request(Method::POST, &format!("/v1/checkout/{id}/submit"))?
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Fetch a placed order.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the session placed no such order.
    pub async fn get_order(&self, order_id: &OrderId) -> Result<OrderDetails, ClientError> {
        let response = self
            .request(Method::GET, &format!("/v1/orders/{order_id}"))?
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Build a session-scoped request.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let session_id = self
            .session_id
            .as_deref()
            .ok_or_else(|| ClientError::Configuration("no session set".to_string()))?;

        Ok(self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header(SESSION_HEADER, session_id))
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let message = api_error.error.message;
                let details = api_error.error.details;

                match code {
                    "not_found" => Err(ClientError::NotFound(message)),
                    "conflict" => Err(ClientError::Conflict(message)),
                    "validation_failed" => {
                        let fields = details
                            .and_then(|d| serde_json::from_value::<BTreeMap<String, String>>(d).ok())
                            .unwrap_or_default();
                        Err(ClientError::Validation(fields))
                    }
                    "payment_declined" => {
                        let reason = details
                            .as_ref()
                            .and_then(|d| d.get("reason"))
                            .and_then(serde_json::Value::as_str)
                            .map_or(message, str::to_string);
                        Err(ClientError::Declined { reason })
                    }
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Session to use from the start.
    pub session_id: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            session_id: None,
        }
    }
}
