use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::orders::{AdvanceRequest, CustomerActor, DriverActor};
use crate::error::AppError;
use crate::lifecycle::parcel::{self, RequestParcelRequest};
use crate::models::PaymentMethod;
use crate::models::parcel::Parcel;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parcels", post(request_parcel))
        .route("/parcels/:id", get(get_parcel))
        .route("/parcels/:id/assign", post(assign_driver))
        .route("/parcels/:id/goods-cost", post(set_goods_cost))
        .route("/parcels/:id/payment-method", post(choose_payment_method))
        .route("/parcels/:id/advance", post(advance_status))
        .route("/parcels/:id/payment-sent", post(confirm_payment_sent))
        .route("/parcels/:id/payment-received", post(acknowledge_payment))
}

#[derive(Deserialize)]
pub struct SetGoodsCostRequest {
    pub driver_id: Uuid,
    pub goods_cost: Decimal,
}

#[derive(Deserialize)]
pub struct ChoosePaymentMethodRequest {
    pub customer_id: Uuid,
    pub method: PaymentMethod,
}

async fn request_parcel(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RequestParcelRequest>,
) -> Result<Json<Parcel>, AppError> {
    parcel::request_parcel(&state, payload).map(Json)
}

async fn get_parcel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Parcel>, AppError> {
    let parcel = state
        .parcels
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("parcel {id} not found")))?;

    Ok(Json(parcel.value().clone()))
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActor>,
) -> Result<Json<Parcel>, AppError> {
    parcel::assign_driver(&state, id, payload.driver_id).map(Json)
}

async fn set_goods_cost(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetGoodsCostRequest>,
) -> Result<Json<Parcel>, AppError> {
    parcel::set_goods_cost(&state, id, payload.driver_id, payload.goods_cost).map(Json)
}

async fn choose_payment_method(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChoosePaymentMethodRequest>,
) -> Result<Json<Parcel>, AppError> {
    parcel::choose_payment_method(&state, id, payload.customer_id, payload.method).map(Json)
}

async fn advance_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<Json<Parcel>, AppError> {
    parcel::advance_status(&state, id, payload.actor_id, payload.role).map(Json)
}

async fn confirm_payment_sent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerActor>,
) -> Result<Json<Parcel>, AppError> {
    parcel::confirm_payment_sent(&state, id, payload.customer_id).map(Json)
}

async fn acknowledge_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActor>,
) -> Result<Json<Parcel>, AppError> {
    parcel::acknowledge_payment(&state, id, payload.driver_id).map(Json)
}
