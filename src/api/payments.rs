//! Gateway order creation, checkout signature verification and webhooks.

use axum::{body::Bytes, extract::State, http::{HeaderMap, StatusCode}, Json};
use tracing::{info, warn};

use super::orders::load_visible;
use super::{ApiResult, AppState, Caller};
use crate::domain::aggregates::Order;
use crate::payment::{CreateGatewayOrder, GatewayOrderRequest, GatewayOrderResponse, VerifyPaymentRequest, VerifyPaymentResponse, WebhookEvent, WebhookKind};
use crate::StoreError;

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Creates the gateway-side order for exactly the amount due now.
pub async fn create_gateway_order(State(s): State<AppState>, caller: Caller, Json(r): Json<GatewayOrderRequest>) -> ApiResult<Json<GatewayOrderResponse>> {
    let mut order = load_visible(&s, &caller, &r.order_id).await?;
    let charge = order.charge_amount();
    if r.amount != charge {
        return Err(StoreError::Validation(format!("Amount {} does not match the amount due {}", r.amount, charge)).into());
    }
    if !charge.amount().is_positive() {
        return Err(StoreError::Validation("Nothing to pay for this order".into()).into());
    }
    let currency = r.currency.map(|c| c.to_uppercase()).unwrap_or_else(|| s.config.currency.clone());
    let request = CreateGatewayOrder {
        amount: charge.to_minor_units(),
        currency,
        receipt: order.id().to_string(),
        notes: serde_json::json!({ "order_id": order.id() }),
    };
    let gateway_order = s.gateway.create_order(&request).await.map_err(StoreError::from)?;
    order.attach_gateway_order(&gateway_order.id).map_err(StoreError::from)?;
    s.repos.orders.save(&order).await?;
    s.events.publish(order.take_events()).await;
    info!(order_id = %order.id(), gateway_order_id = %gateway_order.id, amount = charge.amount(), "gateway order created");
    Ok(Json(GatewayOrderResponse { key_id: s.gateway.key_id().to_string(), order: gateway_order }))
}

/// A bad signature is reported as `verified: false`, not as an HTTP error.
pub async fn verify_payment(State(s): State<AppState>, caller: Caller, Json(r): Json<VerifyPaymentRequest>) -> ApiResult<Json<VerifyPaymentResponse>> {
    let mut order = load_visible(&s, &caller, &r.order_id).await?;
    let matches_order = order.gateway_order_id() == Some(r.razorpay_order_id.as_str());
    if !matches_order || !s.gateway.verify_payment_signature(&r.razorpay_order_id, &r.razorpay_payment_id, &r.razorpay_signature) {
        warn!(order_id = %order.id(), payment_id = %r.razorpay_payment_id, matches_order, "payment signature rejected");
        return Ok(Json(VerifyPaymentResponse { verified: false }));
    }
    order.mark_paid(&r.razorpay_payment_id).map_err(StoreError::from)?;
    s.repos.orders.save(&order).await?;
    s.events.publish(order.take_events()).await;
    info!(order_id = %order.id(), payment_id = %r.razorpay_payment_id, "payment verified");
    Ok(Json(VerifyPaymentResponse { verified: true }))
}

/// Server-side reconciliation. Anything we cannot act on is acknowledged so the
/// gateway does not keep redelivering it.
pub async fn webhook(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<serde_json::Value>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
    if !s.gateway.verify_webhook_signature(&body, signature) {
        warn!("webhook signature rejected");
        return Err((StatusCode::BAD_REQUEST, "Invalid signature".to_string()));
    }
    let event = WebhookEvent::parse(&body).map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid payload: {e}")))?;
    let ack = Json(serde_json::json!({ "status": "ok" }));

    if let WebhookKind::Ignored(name) = &event.kind {
        info!(event = %name, "webhook ignored");
        return Ok(ack);
    }
    let Some(order_id) = event.order_id.as_deref() else {
        warn!(kind = ?event.kind, "webhook without order reference");
        return Ok(ack);
    };
    let Some(mut order) = s.repos.orders.get(order_id).await? else {
        warn!(order_id, "webhook for unknown order");
        return Ok(ack);
    };
    if let Err(e) = apply_webhook(&mut order, &event) {
        warn!(order_id, kind = ?event.kind, error = %e, "webhook not applied");
        return Ok(ack);
    }
    s.repos.orders.save(&order).await?;
    s.events.publish(order.take_events()).await;
    info!(order_id, kind = ?event.kind, "webhook applied");
    Ok(ack)
}

fn apply_webhook(order: &mut Order, event: &WebhookEvent) -> Result<(), crate::domain::aggregates::OrderError> {
    match event.kind {
        WebhookKind::Captured => order.mark_paid(event.payment_id.clone().unwrap_or_default()),
        WebhookKind::Failed => order.mark_payment_failed(),
        WebhookKind::Refunded => order.mark_refunded(),
        WebhookKind::Ignored(_) => Ok(()),
    }
}
