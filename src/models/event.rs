use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::OrderStatus;
use crate::models::parcel::ParcelStatus;

/// Emitted on the broadcast bus after a status write commits. The notifier
/// and websocket fan-out subscribe; the state machines never wait on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "entity")]
pub enum StatusChanged {
    Order {
        id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    Parcel {
        id: Uuid,
        old_status: ParcelStatus,
        new_status: ParcelStatus,
    },
}
