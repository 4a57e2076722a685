use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParcelStatus {
    PendingDriverAssignment,
    DriverAssigned,
    AtPickup,
    PendingPayment,
    AwaitingDriverConfirmation,
    InTransit,
    AtDropoff,
    Delivered,
}

impl ParcelStatus {
    pub fn display_text(&self) -> &'static str {
        match self {
            ParcelStatus::PendingDriverAssignment => "Pending Driver Assignment",
            ParcelStatus::DriverAssigned => "Driver Assigned",
            ParcelStatus::AtPickup => "Driver at Pickup",
            ParcelStatus::PendingPayment => "Pending Payment",
            ParcelStatus::AwaitingDriverConfirmation => "Awaiting Driver Confirmation",
            ParcelStatus::InTransit => "In Transit",
            ParcelStatus::AtDropoff => "Driver at Dropoff",
            ParcelStatus::Delivered => "Delivered",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelItem {
    pub description: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub items: Vec<ParcelItem>,
    pub status: ParcelStatus,
    pub delivery_fee: Decimal,
    /// Cash the driver fronts for purchased goods, entered at the pickup
    /// point. Zero means a pure courier job.
    pub goods_cost: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    /// goods_cost + delivery_fee once both are known.
    pub total: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}
