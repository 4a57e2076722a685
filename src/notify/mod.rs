//! Notification trigger layer. Subscribes to the `StatusChanged` broadcast
//! and dispatches templated messages plus a push fallback to the relevant
//! counterparties. Strictly best-effort: failures are logged and swallowed,
//! and the state machines never wait for dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};

use crate::models::event::StatusChanged;
use crate::state::AppState;

/// Delivery transport boundary. The real transport (SMS/WhatsApp templates,
/// push provider) lives outside this service; both calls are
/// fire-and-forget with no delivery guarantee surfaced back.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send_template(
        &self,
        target: &str,
        template: &str,
        params: &[String],
    ) -> Result<(), String>;

    async fn send_push(&self, device_token: &str, title: &str, body: &str)
    -> Result<(), String>;
}

/// Default transport: logs what would be sent.
pub struct LogTransport;

#[async_trait]
impl NotificationTransport for LogTransport {
    async fn send_template(
        &self,
        target: &str,
        template: &str,
        params: &[String],
    ) -> Result<(), String> {
        info!(target, template, ?params, "template notification dispatched");
        Ok(())
    }

    async fn send_push(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
    ) -> Result<(), String> {
        info!(device_token, title, body, "push notification dispatched");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMessage {
    pub target: String,
    pub template: &'static str,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub device_token: String,
    pub title: String,
    pub body: String,
}

pub async fn run_notifier(state: Arc<AppState>, transport: Arc<dyn NotificationTransport>) {
    info!("notifier started");

    let mut events = BroadcastStream::new(state.status_events_tx.subscribe());
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => dispatch(&state, transport.as_ref(), &event).await,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "notifier lagged behind status events");
            }
        }
    }

    warn!("notifier stopped: event channel closed");
}

pub async fn dispatch(state: &AppState, transport: &dyn NotificationTransport, event: &StatusChanged) {
    let (templates, push) = render(state, event);

    for message in templates {
        let outcome = transport
            .send_template(&message.target, message.template, &message.params)
            .await;

        match outcome {
            Ok(()) => {
                state
                    .metrics
                    .notifications_total
                    .with_label_values(&["template", "success"])
                    .inc();
            }
            Err(err) => {
                state
                    .metrics
                    .notifications_total
                    .with_label_values(&["template", "error"])
                    .inc();
                warn!(error = %err, template = message.template, "template notification failed");
            }
        }
    }

    if let Some(push) = push {
        let outcome = transport
            .send_push(&push.device_token, &push.title, &push.body)
            .await;

        match outcome {
            Ok(()) => {
                state
                    .metrics
                    .notifications_total
                    .with_label_values(&["push", "success"])
                    .inc();
            }
            Err(err) => {
                state
                    .metrics
                    .notifications_total
                    .with_label_values(&["push", "error"])
                    .inc();
                warn!(error = %err, "push notification failed");
            }
        }
    }
}

/// Template matrix for one observed status change, plus the push fallback
/// that is attempted for every change regardless of template dispatch.
pub fn render(state: &AppState, event: &StatusChanged) -> (Vec<TemplateMessage>, Option<PushMessage>) {
    use crate::models::parcel::ParcelStatus;

    let mut templates = Vec::new();
    let mut push = None;

    match event {
        StatusChanged::Order { id, new_status, .. } => {
            // Copy what we need out of the orders store before the party
            // lookups; no guard is held across two stores at once.
            let Some(customer_id) = state.orders.get(id).map(|order| order.customer_id) else {
                warn!(order_id = %id, "status event for unknown order");
                return (templates, push);
            };

            if let Some(customer) = state.customers.get(&customer_id) {
                templates.push(TemplateMessage {
                    target: customer.contact.clone(),
                    template: "order_status_update",
                    params: vec![new_status.display_text().to_string()],
                });
                push = customer.device_token.as_ref().map(|token| PushMessage {
                    device_token: token.clone(),
                    title: "Order update".to_string(),
                    body: new_status.display_text().to_string(),
                });
            }
        }
        StatusChanged::Parcel { id, new_status, .. } => {
            let Some(parcel) = state.parcels.get(id).map(|parcel| parcel.clone()) else {
                warn!(parcel_id = %id, "status event for unknown parcel");
                return (templates, push);
            };
            let customer = state
                .customers
                .get(&parcel.customer_id)
                .map(|customer| (customer.contact.clone(), customer.device_token.clone()));

            match new_status {
                ParcelStatus::DriverAssigned => {
                    let driver_name = parcel
                        .driver_id
                        .and_then(|id| state.drivers.get(&id))
                        .map(|driver| driver.name.clone())
                        .unwrap_or_else(|| "your driver".to_string());

                    if let Some((contact, _)) = &customer {
                        templates.push(TemplateMessage {
                            target: contact.clone(),
                            template: "parcel_driver_assigned",
                            params: vec![driver_name],
                        });
                    }
                }
                ParcelStatus::PendingPayment => {
                    let amount_due = parcel
                        .total
                        .map(|total| total.to_string())
                        .unwrap_or_default();

                    if let Some((contact, _)) = &customer {
                        templates.push(TemplateMessage {
                            target: contact.clone(),
                            template: "parcel_payment_due",
                            params: vec![amount_due],
                        });
                    }
                }
                ParcelStatus::AwaitingDriverConfirmation => {
                    if let Some(driver) =
                        parcel.driver_id.and_then(|id| state.drivers.get(&id))
                    {
                        templates.push(TemplateMessage {
                            target: driver.contact.clone(),
                            template: "parcel_payment_sent",
                            params: vec![parcel.id.to_string()],
                        });
                    }
                }
                _ => {}
            }

            push = customer.and_then(|(_, device_token)| {
                device_token.map(|token| PushMessage {
                    device_token: token,
                    title: "Parcel update".to_string(),
                    body: new_status.display_text().to_string(),
                })
            });
        }
    }

    (templates, push)
}
