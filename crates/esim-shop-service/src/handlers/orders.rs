//! Order lookup handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use esim_shop_core::{format_cents, Order, OrderId, ShopError};

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Order details response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    /// The order.
    #[serde(flatten)]
    pub order: Order,
    /// Total as dollars.
    pub total_formatted: String,
}

/// Get one of the session's orders.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let not_found = || ShopError::OrderNotFound {
        order_id: order_id.clone(),
    };
    let id: OrderId = order_id.parse().map_err(|_| not_found())?;

    let order = state
        .orders
        .get_order_details(session.user_id, &id)?
        .ok_or_else(not_found)?;

    Ok(Json(OrderResponse {
        total_formatted: format_cents(order.totals.total_cents),
        order,
    }))
}
