use std::sync::Mutex;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::customer::Customer;
use crate::models::driver::Driver;
use crate::models::event::StatusChanged;
use crate::models::order::Order;
use crate::models::parcel::Parcel;
use crate::models::restaurant::Restaurant;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub customers: DashMap<Uuid, Customer>,
    pub drivers: DashMap<Uuid, Driver>,
    pub restaurants: DashMap<Uuid, Restaurant>,
    pub orders: DashMap<Uuid, Order>,
    pub parcels: DashMap<Uuid, Parcel>,
    /// Serializes every mirrored-ledger mutation so both halves of a
    /// driver/restaurant pair always move inside one critical section.
    pub ledger_lock: Mutex<()>,
    pub status_events_tx: broadcast::Sender<StatusChanged>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (status_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            customers: DashMap::new(),
            drivers: DashMap::new(),
            restaurants: DashMap::new(),
            orders: DashMap::new(),
            parcels: DashMap::new(),
            ledger_lock: Mutex::new(()),
            status_events_tx,
            metrics: Metrics::new(),
        }
    }

    /// Fire-and-forget: a send error only means nobody is subscribed.
    pub fn emit(&self, event: StatusChanged) {
        let _ = self.status_events_tx.send(event);
    }
}
