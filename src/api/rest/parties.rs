use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::PaymentMethod;
use crate::models::customer::Customer;
use crate::models::driver::{AreaFee, Driver, MethodFee};
use crate::models::order::MenuItem;
use crate::models::restaurant::Restaurant;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", post(register_customer))
        .route("/customers/:id", get(get_customer))
        .route("/drivers", post(register_driver))
        .route("/drivers/:id", get(get_driver))
        .route("/restaurants", post(register_restaurant))
        .route("/restaurants/:id", get(get_restaurant))
}

#[derive(Deserialize)]
pub struct RegisterCustomerRequest {
    pub name: String,
    pub contact: String,
    pub device_token: Option<String>,
    pub address: String,
}

#[derive(Deserialize)]
pub struct RegisterDriverRequest {
    pub name: String,
    pub contact: String,
    pub device_token: Option<String>,
    /// An empty list is a valid state; it only means the customer has no
    /// method to choose from yet.
    #[serde(default)]
    pub accepted_payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub base_fee: Decimal,
    #[serde(default)]
    pub fees: HashMap<PaymentMethod, MethodFee>,
    #[serde(default)]
    pub delivery_areas: HashMap<String, AreaFee>,
}

#[derive(Deserialize)]
pub struct RegisterRestaurantRequest {
    pub name: String,
    pub address: String,
    pub contact: String,
    #[serde(default)]
    pub menu: Vec<MenuItem>,
}

async fn register_customer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if payload.address.trim().is_empty() {
        return Err(AppError::Validation("address cannot be empty".to_string()));
    }

    let customer = Customer {
        id: Uuid::new_v4(),
        name: payload.name,
        contact: payload.contact,
        device_token: payload.device_token,
        address: payload.address,
    };

    state.customers.insert(customer.id, customer.clone());
    Ok(Json(customer))
}

async fn register_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if payload.base_fee < Decimal::ZERO {
        return Err(AppError::Validation("base fee cannot be negative".to_string()));
    }

    let driver = Driver {
        id: Uuid::new_v4(),
        name: payload.name,
        contact: payload.contact,
        device_token: payload.device_token,
        accepted_payment_methods: payload.accepted_payment_methods,
        base_fee: payload.base_fee,
        fees: payload.fees,
        delivery_areas: payload.delivery_areas,
        earnings: HashMap::new(),
        restaurant_ledger: HashMap::new(),
        reviews: Vec::new(),
        rating: 0.0,
    };

    state.drivers.insert(driver.id, driver.clone());
    Ok(Json(driver))
}

async fn register_restaurant(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRestaurantRequest>,
) -> Result<Json<Restaurant>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if payload.address.trim().is_empty() {
        return Err(AppError::Validation("address cannot be empty".to_string()));
    }

    let restaurant = Restaurant {
        id: Uuid::new_v4(),
        name: payload.name,
        address: payload.address,
        contact: payload.contact,
        menu: payload.menu,
        driver_ledger: HashMap::new(),
        reviews: Vec::new(),
        rating: 0.0,
    };

    state.restaurants.insert(restaurant.id, restaurant.clone());
    Ok(Json(restaurant))
}

async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    let customer = state
        .customers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("customer {id} not found")))?;

    Ok(Json(customer.value().clone()))
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    let driver = state
        .drivers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    Ok(Json(driver.value().clone()))
}

async fn get_restaurant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Restaurant>, AppError> {
    let restaurant = state
        .restaurants
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {id} not found")))?;

    Ok(Json(restaurant.value().clone()))
}
