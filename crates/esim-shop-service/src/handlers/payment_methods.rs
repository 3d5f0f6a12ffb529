//! Saved payment method handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use esim_shop_core::{
    NewPaymentMethod, PaymentMethod, PaymentMethodId, PaymentMethodUpdate, ShopError,
};

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::handlers::today;
use crate::state::AppState;

/// Edit request; the method id comes from the path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentMethodRequest {
    /// New name on the card.
    pub card_name: String,
    /// New `MM/YY`.
    pub expiry_date: String,
    /// Make this the default card.
    #[serde(default)]
    pub make_default: bool,
    /// Replacement card number.
    #[serde(default)]
    pub card_number: Option<String>,
    /// Security code of the replacement card.
    #[serde(default)]
    pub cvv: Option<String>,
}

/// Delete response.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Always true; deleting an unknown card is not an error.
    pub success: bool,
}

fn not_found(id: impl ToString) -> ShopError {
    ShopError::PaymentMethodNotFound { id: id.to_string() }
}

fn parse_id(raw: &str) -> Result<PaymentMethodId, ApiError> {
    raw.parse().map_err(|_| not_found(raw).into())
}

/// List the session's saved cards, most recent first.
pub async fn list_payment_methods(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> Result<Json<Vec<PaymentMethod>>, ApiError> {
    let methods = state.payment_methods.list(&session.user_id)?;
    Ok(Json(methods.into_vec()))
}

/// Save a new card.
pub async fn create_payment_method(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Json(body): Json<NewPaymentMethod>,
) -> Result<(StatusCode, Json<PaymentMethod>), ApiError> {
    body.validate(today()).into_result().map_err(ApiError::Validation)?;

    let method = state.payment_methods.save(&session.user_id, body)?;
    Ok((StatusCode::CREATED, Json(method)))
}

/// Get one saved card.
pub async fn get_payment_method(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentMethod>, ApiError> {
    let id = parse_id(&id)?;
    state
        .payment_methods
        .get_by_id(&session.user_id, &id)?
        .map(Json)
        .ok_or_else(|| not_found(&id).into())
}

/// Edit a saved card.
pub async fn update_payment_method(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
    Json(body): Json<UpdatePaymentMethodRequest>,
) -> Result<Json<PaymentMethod>, ApiError> {
    let update = PaymentMethodUpdate {
        id: parse_id(&id)?,
        card_name: body.card_name,
        expiry_date: body.expiry_date,
        make_default: body.make_default,
        card_number: body.card_number,
        cvv: body.cvv,
    };
    update.validate(today()).into_result().map_err(ApiError::Validation)?;

    let method = state.payment_methods.update(&session.user_id, update)?;
    Ok(Json(method))
}

/// Remove a saved card.
pub async fn delete_payment_method(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if let Ok(id) = id.parse::<PaymentMethodId>() {
        state.payment_methods.delete(&session.user_id, &id)?;
    }
    Ok(Json(DeleteResponse { success: true }))
}
