pub mod api;
pub mod config;
pub mod error;
pub mod fees;
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod observability;
pub mod state;
