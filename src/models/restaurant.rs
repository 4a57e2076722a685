use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::MenuItem;
use crate::models::review::Review;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub contact: String,
    pub menu: Vec<MenuItem>,
    /// Running balance each driver owes this restaurant; the mirror of the
    /// driver's restaurant_ledger entry for the same pair.
    pub driver_ledger: HashMap<Uuid, Decimal>,
    pub reviews: Vec<Review>,
    pub rating: f64,
}
