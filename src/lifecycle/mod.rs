//! Order and parcel lifecycle state machines. Each command validates the
//! caller's role against the current status, applies ledger side effects,
//! commits the status write, and only then emits a `StatusChanged` event
//! for the notification layer.

pub mod order;
pub mod parcel;
