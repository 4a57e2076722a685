use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal customer record kept so the notifier has a target address and
/// push token. Identity verification lives upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub device_token: Option<String>,
    pub address: String,
}
