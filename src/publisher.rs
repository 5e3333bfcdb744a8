//! Publishes domain events to NATS when a connection is configured.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self { nats: None } }

    /// Best effort: failures are logged and dropped.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        let Some(client) = &self.nats else {
            for event in &events { debug!(subject = %event.subject(), "event (nats disabled)"); }
            return;
        };
        for event in events {
            let subject = event.subject();
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => { warn!(%subject, error = %e, "failed to encode event"); continue; }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                warn!(%subject, error = %e, "failed to publish event");
            }
        }
    }
}
