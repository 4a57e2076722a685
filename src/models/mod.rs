pub mod customer;
pub mod driver;
pub mod event;
pub mod order;
pub mod parcel;
pub mod restaurant;
pub mod review;

use serde::{Deserialize, Serialize};

/// Payment methods a driver may accept. PayShap is an out-of-band instant
/// transfer confirmed by both parties; the other two are collected on
/// handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    CashOnDelivery,
    Speedpoint,
    PayShap,
}

impl PaymentMethod {
    /// Whether the customer pays before the driver reaches them.
    pub fn is_prepaid(&self) -> bool {
        matches!(self, PaymentMethod::PayShap)
    }
}

/// Caller role attached to every mutating command. Identity verification
/// happens upstream; the state machines only check that the role is allowed
/// to perform the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Driver,
    Restaurant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Driver => write!(f, "driver"),
            Role::Restaurant => write!(f, "restaurant"),
        }
    }
}
