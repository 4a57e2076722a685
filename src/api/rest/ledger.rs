use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::post;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::ledger;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ledger/settle", post(settle))
}

#[derive(Deserialize)]
pub struct SettleRequest {
    pub restaurant_id: Uuid,
    pub driver_id: Uuid,
}

#[derive(Serialize)]
pub struct SettleResponse {
    pub restaurant_id: Uuid,
    pub driver_id: Uuid,
    pub settled: bool,
}

async fn settle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SettleRequest>,
) -> Result<Json<SettleResponse>, AppError> {
    ledger::settle(&state, payload.restaurant_id, payload.driver_id)?;

    Ok(Json(SettleResponse {
        restaurant_id: payload.restaurant_id,
        driver_id: payload.driver_id,
        settled: true,
    }))
}
