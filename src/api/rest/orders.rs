use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::order::{self, PlaceOrderRequest, SubmitReviewRequest};
use crate::models::order::Order;
use crate::models::review::Review;
use crate::models::{PaymentMethod, Role};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/assign", post(assign_driver))
        .route("/orders/:id/payment-method", post(choose_payment_method))
        .route("/orders/:id/advance", post(advance_status))
        .route("/orders/:id/payment-sent", post(confirm_payment_sent))
        .route("/orders/:id/payment-received", post(acknowledge_payment))
        .route("/orders/:id/reviews", post(submit_review))
}

#[derive(Deserialize)]
pub struct RestaurantActor {
    pub restaurant_id: Uuid,
}

#[derive(Deserialize)]
pub struct DriverActor {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct CustomerActor {
    pub customer_id: Uuid,
}

#[derive(Deserialize)]
pub struct ChoosePaymentMethodRequest {
    pub customer_id: Uuid,
    pub method: PaymentMethod,
}

#[derive(Deserialize)]
pub struct AdvanceRequest {
    pub actor_id: Uuid,
    pub role: Role,
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<Json<Order>, AppError> {
    order::place_order(&state, payload).map(Json)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order.value().clone()))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RestaurantActor>,
) -> Result<Json<Order>, AppError> {
    order::accept_order(&state, id, payload.restaurant_id).map(Json)
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActor>,
) -> Result<Json<Order>, AppError> {
    order::assign_driver(&state, id, payload.driver_id).map(Json)
}

async fn choose_payment_method(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChoosePaymentMethodRequest>,
) -> Result<Json<Order>, AppError> {
    order::choose_payment_method(&state, id, payload.customer_id, payload.method).map(Json)
}

async fn advance_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<Json<Order>, AppError> {
    order::advance_status(&state, id, payload.actor_id, payload.role).map(Json)
}

async fn confirm_payment_sent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerActor>,
) -> Result<Json<Order>, AppError> {
    order::confirm_payment_sent(&state, id, payload.customer_id).map(Json)
}

async fn acknowledge_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActor>,
) -> Result<Json<Order>, AppError> {
    order::acknowledge_payment(&state, id, payload.driver_id).map(Json)
}

async fn submit_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<Review>, AppError> {
    order::submit_review(&state, id, payload).map(Json)
}
