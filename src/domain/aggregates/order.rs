//! Order Aggregate
//!
//! Two independent axes: fulfilment `status` (pending → processing → shipped →
//! delivered, or cancelled from any non-terminal state) and `payment_status`
//! (pending → completed | failed | refunded).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, PromoCode, Quantity};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: String,
    user_id: String,
    items: Vec<LineItem>,
    subtotal: Money,
    discount: Money,
    total: Money,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: PaymentMode,
    buyer: BuyerDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    promo_code: Option<PromoCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gateway_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    partial_payment: Option<PartialPayment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub price: Money,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LineItem {
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity.value()) }
}

/// Buyer profile captured at checkout. Deliveries go to campus, so the
/// "address" is college + campus + branch/division.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyerDetails {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub branch: String,
    pub division: String,
    pub college: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campus: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPayment {
    pub enabled: bool,
    pub amount_paid_now: Money,
    pub due_on_delivery: Money,
    pub remaining_payment_received: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_payment_received_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Completed, Failed, Refunded }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode { #[default] Full, Half }

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }

    /// Position along the fulfilment path; cancelled sits outside it.
    fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() { return false; }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!((self, next), (Pending, Completed) | (Pending, Failed) | (Failed, Completed) | (Failed, Pending) | (Completed, Refunded))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

impl Order {
    /// Builds a new order with status pending/pending. `total` is derived here and
    /// nowhere else: `max(0, subtotal - discount)`. A zero total has nothing to
    /// charge and is settled immediately (processing/completed); half payment
    /// falls back to full when the first half would be zero.
    pub fn compose(
        user_id: impl Into<String>,
        items: Vec<LineItem>,
        buyer: BuyerDetails,
        promo_code: Option<PromoCode>,
        discount: Money,
        mode: PaymentMode,
    ) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        let subtotal: Money = items.iter().map(LineItem::line_total).sum();
        let discount = discount.clamp_non_negative().min(subtotal);
        let total = subtotal.saturating_sub(discount).clamp_non_negative();
        let mode = if total.half_floor().is_zero() { PaymentMode::Full } else { mode };
        let partial_payment = match mode {
            PaymentMode::Full => None,
            PaymentMode::Half => {
                let now_amount = total.half_floor();
                Some(PartialPayment {
                    enabled: true,
                    amount_paid_now: now_amount,
                    due_on_delivery: total.saturating_sub(now_amount),
                    remaining_payment_received: false,
                    remaining_payment_received_at: None,
                })
            }
        };
        let settled = total.is_zero();
        let now = Utc::now();
        let user_id = user_id.into();
        let mut order = Self {
            id: Uuid::now_v7().to_string(), user_id: user_id.clone(), items, subtotal, discount, total,
            status: if settled { OrderStatus::Processing } else { OrderStatus::Pending },
            payment_status: if settled { PaymentStatus::Completed } else { PaymentStatus::Pending },
            payment_method: mode,
            buyer, promo_code: if discount.is_zero() { None } else { promo_code },
            transaction_id: None, gateway_order_id: None, partial_payment,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(OrderEvent::Created { order_id: order.id.clone(), user_id, total });
        Ok(order)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn discount(&self) -> Money { self.discount }
    pub fn total(&self) -> Money { self.total }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn payment_method(&self) -> PaymentMode { self.payment_method }
    pub fn buyer(&self) -> &BuyerDetails { &self.buyer }
    pub fn promo_code(&self) -> Option<&PromoCode> { self.promo_code.as_ref() }
    pub fn transaction_id(&self) -> Option<&str> { self.transaction_id.as_deref() }
    pub fn gateway_order_id(&self) -> Option<&str> { self.gateway_order_id.as_deref() }
    pub fn partial_payment(&self) -> Option<&PartialPayment> { self.partial_payment.as_ref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Amount charged through the gateway at checkout.
    pub fn charge_amount(&self) -> Money {
        self.partial_payment.as_ref().map(|p| p.amount_paid_now).unwrap_or(self.total)
    }

    /// Amount still to be collected on delivery.
    pub fn outstanding_due(&self) -> Money {
        self.partial_payment.as_ref().filter(|p| !p.remaining_payment_received).map(|p| p.due_on_delivery).unwrap_or_default()
    }

    pub fn attach_gateway_order(&mut self, gateway_order_id: impl Into<String>) -> Result<(), OrderError> {
        if self.payment_status == PaymentStatus::Completed { return Err(OrderError::AlreadyPaid); }
        if self.status == OrderStatus::Cancelled { return Err(OrderError::Cancelled); }
        let gateway_order_id = gateway_order_id.into();
        self.gateway_order_id = Some(gateway_order_id.clone());
        self.touch();
        self.raise_event(OrderEvent::GatewayOrderAttached { order_id: self.id.clone(), gateway_order_id });
        Ok(())
    }

    /// Verified gateway payment. Repeated confirmations (verify + webhook) are no-ops.
    pub fn mark_paid(&mut self, transaction_id: impl Into<String>) -> Result<(), OrderError> {
        if self.payment_status == PaymentStatus::Completed { return Ok(()); }
        if self.status == OrderStatus::Cancelled { return Err(OrderError::Cancelled); }
        if !self.payment_status.can_transition_to(PaymentStatus::Completed) {
            return Err(OrderError::InvalidPaymentTransition { from: self.payment_status, to: PaymentStatus::Completed });
        }
        let transaction_id = transaction_id.into();
        self.transaction_id = Some(transaction_id.clone());
        self.set_payment(PaymentStatus::Completed);
        if self.status == OrderStatus::Pending { self.set_status(OrderStatus::Processing); }
        self.raise_event(OrderEvent::Paid { order_id: self.id.clone(), transaction_id });
        Ok(())
    }

    pub fn mark_payment_failed(&mut self) -> Result<(), OrderError> {
        if self.payment_status == PaymentStatus::Failed { return Ok(()); }
        self.set_payment_status(PaymentStatus::Failed)
    }

    pub fn mark_refunded(&mut self) -> Result<(), OrderError> {
        if self.payment_status == PaymentStatus::Refunded { return Ok(()); }
        self.set_payment_status(PaymentStatus::Refunded)
    }

    /// Admin status change. Same-state requests are accepted without effect.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if self.status == next { return Ok(()); }
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status, to: next });
        }
        self.set_status(next);
        Ok(())
    }

    pub fn set_payment_status(&mut self, next: PaymentStatus) -> Result<(), OrderError> {
        if self.payment_status == next { return Ok(()); }
        if !self.payment_status.can_transition_to(next) {
            return Err(OrderError::InvalidPaymentTransition { from: self.payment_status, to: next });
        }
        self.set_payment(next);
        Ok(())
    }

    /// Admin confirms the due-on-delivery half was collected.
    pub fn mark_remaining_received(&mut self) -> Result<Money, OrderError> {
        if self.status == OrderStatus::Cancelled { return Err(OrderError::Cancelled); }
        let partial = self.partial_payment.as_ref().filter(|p| p.enabled).ok_or(OrderError::NotPartialPayment)?;
        if partial.remaining_payment_received { return Err(OrderError::RemainingAlreadyReceived); }
        if self.payment_status != PaymentStatus::Completed && !self.payment_status.can_transition_to(PaymentStatus::Completed) {
            return Err(OrderError::InvalidPaymentTransition { from: self.payment_status, to: PaymentStatus::Completed });
        }
        let partial = self.partial_payment.as_mut().filter(|p| p.enabled).ok_or(OrderError::NotPartialPayment)?;
        let amount = partial.due_on_delivery;
        partial.due_on_delivery = Money::zero();
        partial.remaining_payment_received = true;
        partial.remaining_payment_received_at = Some(Utc::now());
        if self.payment_status != PaymentStatus::Completed { self.set_payment(PaymentStatus::Completed); }
        if self.status == OrderStatus::Pending { self.set_status(OrderStatus::Processing); }
        self.touch();
        self.raise_event(OrderEvent::RemainingPaymentReceived { order_id: self.id.clone(), amount });
        Ok(amount)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn set_status(&mut self, to: OrderStatus) {
        let from = std::mem::replace(&mut self.status, to);
        self.touch();
        self.raise_event(OrderEvent::StatusChanged { order_id: self.id.clone(), from, to });
    }

    fn set_payment(&mut self, to: PaymentStatus) {
        let from = std::mem::replace(&mut self.payment_status, to);
        self.touch();
        self.raise_event(OrderEvent::PaymentStatusChanged { order_id: self.id.clone(), from, to });
    }

    fn raise_event(&mut self, e: OrderEvent) { self.events.push(DomainEvent::Order(e)); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    NoItems,
    Cancelled,
    AlreadyPaid,
    NotPartialPayment,
    RemainingAlreadyReceived,
    UnknownStatus(String),
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },
}
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::Cancelled => write!(f, "Order is cancelled"),
            Self::AlreadyPaid => write!(f, "Order is already paid"),
            Self::NotPartialPayment => write!(f, "Order has no partial payment"),
            Self::RemainingAlreadyReceived => write!(f, "Remaining payment already received"),
            Self::UnknownStatus(s) => write!(f, "Unknown status '{s}'"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot move order from {from} to {to}"),
            Self::InvalidPaymentTransition { from, to } => write!(f, "Cannot move payment from {from} to {to}"),
        }
    }
}
