//! Client half of the payment flow: gateway order, hosted widget, verification.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::cart_store::CartStore;
use crate::domain::aggregates::Order;
use crate::domain::value_objects::Money;
use crate::payment::{GatewayOrderRequest, GatewayOrderResponse, VerifyPaymentRequest, VerifyPaymentResponse};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Payment cancelled")]
    PaymentCancelled,
}

#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn create_gateway_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrderResponse, BridgeError>;
    async fn verify_payment(&self, request: &VerifyPaymentRequest) -> Result<VerifyPaymentResponse, BridgeError>;
}

/// Talks to this service's own `/api/v1/payments/*` endpoints.
#[derive(Clone)]
pub struct HttpPaymentApi {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
}

impl HttpPaymentApi {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into().trim_end_matches('/').to_string(), user_id: user_id.into() }
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BridgeError>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let response = self.http
            .post(format!("{}{}", self.base_url, path))
            .header("x-user-id", &self.user_id)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BridgeError::Rejected { status: status.as_u16(), message });
        }
        Ok(response.json::<Resp>().await?)
    }
}

#[async_trait]
impl PaymentApi for HttpPaymentApi {
    async fn create_gateway_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrderResponse, BridgeError> {
        self.post("/api/v1/payments/orders", request).await
    }

    async fn verify_payment(&self, request: &VerifyPaymentRequest) -> Result<VerifyPaymentResponse, BridgeError> {
        self.post("/api/v1/payments/verify", request).await
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Prefill { pub name: String, pub email: Option<String>, pub contact: String }

#[derive(Clone, Debug, PartialEq)]
pub struct WidgetOptions {
    pub key: String,
    /// Minor units, as the gateway order carries it.
    pub amount: i64,
    pub currency: String,
    pub gateway_order_id: String,
    pub name: String,
    pub description: String,
    pub prefill: Prefill,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WidgetOutcome {
    Completed { gateway_order_id: String, payment_id: String, signature: String },
    Dismissed,
}

/// The hosted checkout UI.
#[async_trait]
pub trait CheckoutWidget: Send {
    async fn open(&mut self, options: WidgetOptions) -> WidgetOutcome;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub order_id: String,
    pub payment_id: String,
    /// Advisory only; the server reconciles the order through the webhook.
    pub verified: bool,
}

pub struct PaymentBridge {
    api: Arc<dyn PaymentApi>,
    store_name: String,
}

impl PaymentBridge {
    pub fn new(api: Arc<dyn PaymentApi>, store_name: impl Into<String>) -> Self {
        Self { api, store_name: store_name.into() }
    }

    /// Charges `order.charge_amount()` through the widget.
    ///
    /// Once the widget reports success the buyer always lands on the
    /// confirmation: verification problems are logged, not returned.
    pub async fn pay(&self, order: &Order, widget: &mut dyn CheckoutWidget, cart: &mut CartStore) -> Result<Confirmation, BridgeError> {
        let charge: Money = order.charge_amount();
        let request = GatewayOrderRequest { order_id: order.id().to_string(), amount: charge, currency: None };
        let created = self.api.create_gateway_order(&request).await.map_err(|e| {
            error!(order_id = %order.id(), error = %e, "could not create gateway order");
            e
        })?;

        let buyer = order.buyer();
        let options = WidgetOptions {
            key: created.key_id,
            amount: created.order.amount,
            currency: created.order.currency,
            gateway_order_id: created.order.id,
            name: self.store_name.clone(),
            description: format!("Order {}", order.id()),
            prefill: Prefill { name: buyer.name.clone(), email: buyer.email.clone(), contact: buyer.phone.clone() },
        };

        let (gateway_order_id, payment_id, signature) = match widget.open(options).await {
            WidgetOutcome::Completed { gateway_order_id, payment_id, signature } => (gateway_order_id, payment_id, signature),
            WidgetOutcome::Dismissed => {
                info!(order_id = %order.id(), "payment widget dismissed");
                return Err(BridgeError::PaymentCancelled);
            }
        };

        let verify = VerifyPaymentRequest {
            order_id: order.id().to_string(),
            razorpay_order_id: gateway_order_id,
            razorpay_payment_id: payment_id.clone(),
            razorpay_signature: signature,
        };
        let verified = match self.api.verify_payment(&verify).await {
            Ok(VerifyPaymentResponse { verified: true }) => true,
            Ok(_) => { warn!(order_id = %order.id(), %payment_id, "payment signature not verified"); false }
            Err(e) => { warn!(order_id = %order.id(), %payment_id, error = %e, "payment verification failed"); false }
        };

        if let Err(e) = cart.clear_after_checkout() {
            warn!(order_id = %order.id(), error = %e, "could not clear cart draft");
        }
        Ok(Confirmation { order_id: order.id().to_string(), payment_id, verified })
    }
}
