use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    PendingConfirmation,
    AcceptedByRestaurant,
    PendingDriverAssignment,
    DriverAssigned,
    PendingPayment,
    AwaitingDriverConfirmation,
    AtRestaurant,
    InTransit,
    AtDropoff,
    Delivered,
}

impl OrderStatus {
    /// Customer-facing status text used in notification templates.
    pub fn display_text(&self) -> &'static str {
        match self {
            OrderStatus::PendingConfirmation => "Pending Confirmation",
            OrderStatus::AcceptedByRestaurant => "Accepted by Restaurant",
            OrderStatus::PendingDriverAssignment => "Ready for Pickup",
            OrderStatus::DriverAssigned => "Driver Assigned",
            OrderStatus::PendingPayment => "Pending Payment",
            OrderStatus::AwaitingDriverConfirmation => "Awaiting Driver Confirmation",
            OrderStatus::AtRestaurant => "Driver at Restaurant",
            OrderStatus::InTransit => "In Transit",
            OrderStatus::AtDropoff => "Driver at Dropoff",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    /// Absent until a driver claims the order; immutable once set.
    pub driver_id: Option<Uuid>,
    pub items: Vec<MenuItem>,
    pub status: OrderStatus,
    pub food_total: Decimal,
    /// Zero until a driver is assigned and a payment method chosen.
    pub delivery_fee: Decimal,
    /// Always food_total + delivery_fee.
    pub total: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub customer_address: String,
    pub restaurant_address: String,
    pub created_at: DateTime<Utc>,
    pub is_driver_reviewed: bool,
    pub is_restaurant_reviewed: bool,
}

impl Order {
    pub fn food_total_of(items: &[MenuItem]) -> Decimal {
        items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum()
    }
}
