//! Promo preview and order placement.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState, Caller};
use crate::checkout::{CheckoutLine, CheckoutRequest, PaymentPlan, Quote};
use crate::domain::aggregates::{Order, PaymentMode};
use crate::pricing::DiscountOutcome;

#[derive(Debug, Deserialize)]
pub struct ApplyPromoRequest {
    pub items: Vec<CheckoutLine>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub payment_mode: PaymentMode,
}

#[derive(Debug, Serialize)]
pub struct ApplyPromoResponse {
    #[serde(flatten)]
    pub quote: Quote,
    pub message: &'static str,
}

/// Unknown or inactive codes are not errors: the quote carries a zero discount
/// and a message for the buyer.
pub async fn apply_promo(State(s): State<AppState>, Json(r): Json<ApplyPromoRequest>) -> ApiResult<Json<ApplyPromoResponse>> {
    let quote = s.checkout.quote(r.items, &r.code, r.payment_mode).await?;
    let message = quote.promo.status.message();
    Ok(Json(ApplyPromoResponse { quote, message }))
}

#[derive(Debug, Serialize)] pub struct CheckoutResponse { pub order: Order, pub plan: PaymentPlan, pub promo: DiscountOutcome }

pub async fn checkout(State(s): State<AppState>, Caller(user): Caller, Json(r): Json<CheckoutRequest>) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let summary = s.checkout.compose(user.id(), r).await?;
    let mut order = summary.order;
    s.repos.orders.save(&order).await?;
    s.events.publish(order.take_events()).await;
    Ok((StatusCode::CREATED, Json(CheckoutResponse { order, plan: summary.plan, promo: summary.promo })))
}
