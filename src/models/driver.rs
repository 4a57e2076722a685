use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PaymentMethod;
use crate::models::review::Review;

/// Surcharge attached to a payment method in a driver's fee table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodFee {
    pub base_fee: Decimal,
}

/// Flat fee for deliveries into a named geographic area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaFee {
    pub base_fee: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub device_token: Option<String>,
    pub accepted_payment_methods: Vec<PaymentMethod>,
    /// Fallback payment fee when no method-specific entry exists.
    pub base_fee: Decimal,
    pub fees: HashMap<PaymentMethod, MethodFee>,
    pub delivery_areas: HashMap<String, AreaFee>,
    /// Append-only, keyed by the order or parcel id. Never decremented.
    pub earnings: HashMap<Uuid, Decimal>,
    /// Running balance owed to each restaurant; mirrored on the
    /// restaurant's driver_ledger and removed from both sides on settle.
    pub restaurant_ledger: HashMap<Uuid, Decimal>,
    pub reviews: Vec<Review>,
    pub rating: f64,
}
