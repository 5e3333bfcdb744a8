//! Razorpay REST client.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{checkout_payload, verify_signature, CreateGatewayOrder, GatewayError, GatewayOrder, PaymentGateway};

pub const DEFAULT_BASE_URL: &str = "https://api.razorpay.com";

#[derive(Clone)]
pub struct RazorpayGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
}

impl RazorpayGateway {
    pub fn new(base_url: impl Into<String>, key_id: impl Into<String>, key_secret: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str { &self.key_id }

    async fn create_order(&self, request: &CreateGatewayOrder) -> Result<GatewayOrder, GatewayError> {
        debug!(receipt = %request.receipt, amount = request.amount, "creating gateway order");
        let response = self.http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "gateway rejected order creation");
            return Err(GatewayError::Rejected { status: status.as_u16(), body });
        }
        Ok(response.json::<GatewayOrder>().await?)
    }

    fn verify_payment_signature(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(&self.key_secret, checkout_payload(gateway_order_id, payment_id).as_bytes(), signature)
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        verify_signature(&self.webhook_secret, body, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::sign;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CreateGatewayOrder {
        CreateGatewayOrder { amount: 99_900, currency: "INR".into(), receipt: "o-1".into(), notes: serde_json::json!({ "order_id": "o-1" }) }
    }

    #[tokio::test]
    async fn test_create_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/v1/orders")).and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order_G1", "entity": "order", "amount": 99900, "currency": "INR", "receipt": "o-1", "status": "created"
            })))
            .mount(&server).await;
        let gateway = RazorpayGateway::new(server.uri(), "rzp_test", "secret", "whsec");
        let order = gateway.create_order(&request()).await.unwrap();
        assert_eq!(order.id, "order_G1");
        assert_eq!(order.amount, 99_900);
    }

    #[tokio::test]
    async fn test_create_order_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server).await;
        let gateway = RazorpayGateway::new(server.uri(), "rzp_test", "wrong", "whsec");
        assert!(matches!(gateway.create_order(&request()).await, Err(GatewayError::Rejected { status: 401, .. })));
    }

    #[test]
    fn test_verify_signatures() {
        let gateway = RazorpayGateway::new(DEFAULT_BASE_URL, "rzp_test", "secret", "whsec");
        let sig = sign("secret", b"order_G1|pay_1").unwrap();
        assert!(gateway.verify_payment_signature("order_G1", "pay_1", &sig));
        assert!(!gateway.verify_payment_signature("order_G2", "pay_1", &sig));
        let body = br#"{"event":"payment.captured"}"#;
        assert!(gateway.verify_webhook_signature(body, &sign("whsec", body).unwrap()));
    }
}
