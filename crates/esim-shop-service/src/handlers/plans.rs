//! Plan catalog handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use esim_shop_core::Plan;

use crate::state::AppState;

/// A plan with its display price.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    /// The plan.
    #[serde(flatten)]
    pub plan: Plan,
    /// Price formatted as dollars.
    pub price_formatted: String,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        let price_formatted = plan.price_formatted();
        Self {
            plan,
            price_formatted,
        }
    }
}

/// List the catalog.
pub async fn list_plans(State(state): State<Arc<AppState>>) -> Json<Vec<PlanResponse>> {
    Json(
        state
            .catalog
            .plans()
            .iter()
            .cloned()
            .map(PlanResponse::from)
            .collect(),
    )
}

/// Resolve a plan; unknown ids yield the fallback plan.
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(plan_id): Path<String>,
) -> Json<PlanResponse> {
    Json(state.catalog.resolve(Some(&plan_id)).into())
}
