//! Payment gateway integration (server side).
//!
//! A gateway order is the provider-side object for one chargeable amount; it is
//! distinct from our [`Order`](crate::domain::aggregates::Order). Signatures are
//! lowercase hex HMAC-SHA256.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::value_objects::Money;

pub mod razorpay;

pub use razorpay::RazorpayGateway;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateGatewayOrder {
    /// Minor units (paise).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Publishable key handed to the hosted checkout widget.
    fn key_id(&self) -> &str;

    async fn create_order(&self, request: &CreateGatewayOrder) -> Result<GatewayOrder, GatewayError>;

    fn verify_payment_signature(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool;

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool;
}

pub fn sign(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of a hex signature against the expected HMAC.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() { return false; }
    let Ok(provided) = hex::decode(signature.trim()) else { return false };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else { return false };
    mac.update(payload);
    mac.verify_slice(&provided).is_ok()
}

/// Payload signed by the gateway on checkout completion.
pub fn checkout_payload(gateway_order_id: &str, payment_id: &str) -> String {
    format!("{gateway_order_id}|{payment_id}")
}

// =============================================================================
// Server endpoints shared with the client bridge
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayOrderRequest {
    pub order_id: String,
    /// Whole currency units; must equal the order's charge for its payment mode.
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayOrderResponse {
    pub key_id: String,
    pub order: GatewayOrder,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentResponse { pub verified: bool }

// =============================================================================
// Webhooks
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookKind { Captured, Failed, Refunded, Ignored(String) }

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookEvent {
    pub kind: WebhookKind,
    /// Internal order id, carried in the gateway order/payment notes.
    pub order_id: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Payload,
}

#[derive(Deserialize, Default)]
struct Payload {
    payment: Option<Wrapped<Entity>>,
    order: Option<Wrapped<Entity>>,
}

#[derive(Deserialize)]
struct Wrapped<T> { entity: T }

#[derive(Deserialize)]
struct Entity {
    id: String,
    #[serde(default)]
    notes: serde_json::Value,
}

impl Entity {
    fn order_note(&self) -> Option<String> {
        self.notes.get("order_id").and_then(|v| v.as_str()).map(String::from)
    }
}

impl WebhookEvent {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        let kind = match envelope.event.as_str() {
            "payment.captured" | "order.paid" => WebhookKind::Captured,
            "payment.failed" => WebhookKind::Failed,
            "refund.processed" | "payment.refunded" => WebhookKind::Refunded,
            other => WebhookKind::Ignored(other.to_string()),
        };
        let payment = envelope.payload.payment.map(|w| w.entity);
        let order = envelope.payload.order.map(|w| w.entity);
        let order_id = payment.as_ref().and_then(Entity::order_note).or_else(|| order.as_ref().and_then(Entity::order_note));
        Ok(Self { kind, order_id, payment_id: payment.map(|p| p.id) })
    }
}
