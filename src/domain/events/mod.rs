//! Domain events
use crate::domain::aggregates::{OrderStatus, PaymentStatus};
use crate::domain::value_objects::Money;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Product(ProductEvent),
    Promo(PromoEvent),
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        let (entity, name) = match self {
            DomainEvent::Order(e) => ("orders", e.name()),
            DomainEvent::Product(e) => ("products", e.name()),
            DomainEvent::Promo(e) => ("promos", e.name()),
        };
        format!("storefront.{entity}.{name}")
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: String, user_id: String, total: Money },
    GatewayOrderAttached { order_id: String, gateway_order_id: String },
    Paid { order_id: String, transaction_id: String },
    StatusChanged { order_id: String, from: OrderStatus, to: OrderStatus },
    PaymentStatusChanged { order_id: String, from: PaymentStatus, to: PaymentStatus },
    RemainingPaymentReceived { order_id: String, amount: Money },
    Deleted { order_id: String },
}

impl OrderEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::GatewayOrderAttached { .. } => "gateway_order_attached",
            Self::Paid { .. } => "paid",
            Self::StatusChanged { .. } => "status_changed",
            Self::PaymentStatusChanged { .. } => "payment_status_changed",
            Self::RemainingPaymentReceived { .. } => "remaining_payment_received",
            Self::Deleted { .. } => "deleted",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Saved { product_id: String },
    Deleted { product_id: String },
}

impl ProductEvent {
    fn name(&self) -> &'static str {
        match self { Self::Saved { .. } => "saved", Self::Deleted { .. } => "deleted" }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PromoEvent {
    Saved { promo_id: String, code: String },
    Deleted { promo_id: String },
}

impl PromoEvent {
    fn name(&self) -> &'static str {
        match self { Self::Saved { .. } => "saved", Self::Deleted { .. } => "deleted" }
    }
}
