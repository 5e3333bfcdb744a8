use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use campus_storefront::api::{router, AppState};
use campus_storefront::domain::aggregates::{PaymentOption, Product, ProductDraft, Promo, PromoDraft, Role, UserProfile};
use campus_storefront::payment::{checkout_payload, sign, verify_signature, CreateGatewayOrder, GatewayError, GatewayOrder, PaymentGateway};
use campus_storefront::publisher::EventPublisher;
use campus_storefront::repository::{memory::MemoryStore, Repositories};
use campus_storefront::{AppConfig, Money, PromoCode, PERMISSION_DENIED_MESSAGE};

const KEY_SECRET: &str = "test_secret";
const WEBHOOK_SECRET: &str = "whsec";

struct StubGateway;

#[async_trait]
impl PaymentGateway for StubGateway {
    fn key_id(&self) -> &str { "rzp_test_key" }

    async fn create_order(&self, request: &CreateGatewayOrder) -> Result<GatewayOrder, GatewayError> {
        Ok(GatewayOrder { id: format!("order_{}", request.receipt), amount: request.amount, currency: request.currency.clone(), receipt: Some(request.receipt.clone()), status: Some("created".into()) })
    }

    fn verify_payment_signature(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(KEY_SECRET, checkout_payload(gateway_order_id, payment_id).as_bytes(), signature)
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        verify_signature(WEBHOOK_SECRET, body, signature)
    }
}

struct Fixture { app: Router, store: MemoryStore, kit_id: String, coat_id: String }

async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let mut admin = UserProfile::register("admin-1", "owner@campus.store", "Owner", None);
    admin.set_role(Role::Superadmin);
    store.insert_user(admin).await;
    store.insert_user(UserProfile::register("buyer-1", "asha@college.edu", "Asha", None)).await;
    store.insert_user(UserProfile::register("buyer-2", "ravi@college.edu", "Ravi", None)).await;

    let kit = Product::create(ProductDraft { name: "Drawing Kit".into(), price: Money::new(1249), in_stock: true, category: "kits".into(), allow_partial_payment: true, ..Default::default() }).unwrap();
    let coat = Product::create(ProductDraft { name: "Lab Coat".into(), price: Money::new(350), in_stock: true, category: "apparel".into(), ..Default::default() }).unwrap();
    let (kit_id, coat_id) = (kit.id().to_string(), coat.id().to_string());
    store.insert_product(kit).await;
    store.insert_product(coat).await;
    store.insert_promo(Promo::create(PromoDraft {
        code: PromoCode::parse("FRESHERS2025").unwrap().unwrap(), amount: Money::new(250),
        eligible_product_ids: Some(vec![kit_id.clone()]), active: true, payment_option: PaymentOption::PartialAllowed,
    }).unwrap()).await;

    let config = AppConfig { user_count_admin_email: Some("owner@campus.store".into()), ..AppConfig::default() };
    let state = AppState::new(config, Repositories::in_memory(store.clone()), Arc::new(StubGateway), EventPublisher::disabled());
    Fixture { app: router(state), store, kit_id, coat_id }
}

async fn call(app: &Router, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    if let Some(user) = user { request = request.header("x-user-id", user); }
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

fn buyer() -> Value {
    json!({ "name": "Asha Rao", "phone": "98765 43210", "branch": "Mechanical", "division": "B", "college": "Govt Engineering College" })
}

async fn place_half_order(f: &Fixture) -> Value {
    let (status, body) = call(&f.app, "POST", "/api/v1/checkout", Some("buyer-1"), Some(json!({
        "items": [{ "product_id": f.kit_id, "quantity": 1 }],
        "buyer": buyer(), "promo_code": "freshers2025", "payment_mode": "half"
    }))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn test_half_payment_lifecycle() {
    let f = fixture().await;
    let placed = place_half_order(&f).await;
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(placed["order"]["total"], 999);
    assert_eq!(placed["plan"]["charge_now"], 499);
    assert_eq!(placed["plan"]["due_later"], 500);

    let (status, body) = call(&f.app, "POST", "/api/v1/payments/orders", Some("buyer-1"), Some(json!({ "order_id": order_id, "amount": 999 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, created) = call(&f.app, "POST", "/api/v1/payments/orders", Some("buyer-1"), Some(json!({ "order_id": order_id, "amount": 499 }))).await;
    assert_eq!(status, StatusCode::OK, "{created}");
    assert_eq!(created["key_id"], "rzp_test_key");
    assert_eq!(created["order"]["amount"], 49_900);
    let gateway_order_id = created["order"]["id"].as_str().unwrap().to_string();

    let signature = sign(KEY_SECRET, checkout_payload(&gateway_order_id, "pay_1").as_bytes()).unwrap();
    let (status, verified) = call(&f.app, "POST", "/api/v1/payments/verify", Some("buyer-1"), Some(json!({
        "order_id": order_id, "razorpay_order_id": gateway_order_id, "razorpay_payment_id": "pay_1", "razorpay_signature": signature
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["verified"], true);

    let (_, order) = call(&f.app, "GET", &format!("/api/v1/orders/{order_id}"), Some("buyer-1"), None).await;
    assert_eq!(order["status"], "processing");
    assert_eq!(order["payment_status"], "completed");
    assert_eq!(order["transaction_id"], "pay_1");

    let (_, dashboard) = call(&f.app, "GET", "/api/v1/admin/dashboard", Some("admin-1"), None).await;
    assert_eq!(dashboard["revenue"], 999);
    assert_eq!(dashboard["outstanding_due"], 500);

    let uri = format!("/api/v1/admin/orders/{order_id}/remaining-payment");
    let (status, order) = call(&f.app, "POST", &uri, Some("admin-1"), None).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["partial_payment"]["remaining_payment_received"], true);
    let (status, _) = call(&f.app, "POST", &uri, Some("admin-1"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_bad_signature_leaves_order_pending() {
    let f = fixture().await;
    let placed = place_half_order(&f).await;
    let order_id = placed["order"]["id"].as_str().unwrap();
    let (_, created) = call(&f.app, "POST", "/api/v1/payments/orders", Some("buyer-1"), Some(json!({ "order_id": order_id, "amount": 499 }))).await;
    let (status, verified) = call(&f.app, "POST", "/api/v1/payments/verify", Some("buyer-1"), Some(json!({
        "order_id": order_id, "razorpay_order_id": created["order"]["id"], "razorpay_payment_id": "pay_1", "razorpay_signature": "deadbeef"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["verified"], false);
    let (_, order) = call(&f.app, "GET", &format!("/api/v1/orders/{order_id}"), Some("buyer-1"), None).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
}

#[tokio::test]
async fn test_webhook_reconciles_payment() {
    let f = fixture().await;
    let placed = place_half_order(&f).await;
    let order_id = placed["order"]["id"].as_str().unwrap();
    let payload = json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_9", "notes": { "order_id": order_id } } } }
    }).to_string();

    let bad = Request::builder().method("POST").uri("/api/v1/payments/webhook").header("x-razorpay-signature", "00").body(Body::from(payload.clone())).unwrap();
    assert_eq!(f.app.clone().oneshot(bad).await.unwrap().status(), StatusCode::BAD_REQUEST);

    let signature = sign(WEBHOOK_SECRET, payload.as_bytes()).unwrap();
    let good = Request::builder().method("POST").uri("/api/v1/payments/webhook").header("x-razorpay-signature", signature).body(Body::from(payload)).unwrap();
    assert_eq!(f.app.clone().oneshot(good).await.unwrap().status(), StatusCode::OK);

    let (_, order) = call(&f.app, "GET", &format!("/api/v1/orders/{order_id}"), Some("buyer-1"), None).await;
    assert_eq!(order["payment_status"], "completed");
    assert_eq!(order["status"], "processing");
}

#[tokio::test]
async fn test_tiny_and_free_orders_never_stall_in_pending() {
    let f = fixture().await;
    let pin = Product::create(ProductDraft { name: "Badge Pin".into(), price: Money::new(251), in_stock: true, category: "merch".into(), allow_partial_payment: true, ..Default::default() }).unwrap();
    let pin_id = pin.id().to_string();
    f.store.insert_product(pin).await;
    for (code, amount) in [("PIN250", 250), ("PINFREE", 251)] {
        f.store.insert_promo(Promo::create(PromoDraft {
            code: PromoCode::parse(code).unwrap().unwrap(), amount: Money::new(amount),
            eligible_product_ids: Some(vec![pin_id.clone()]), active: true, payment_option: PaymentOption::PartialAllowed,
        }).unwrap()).await;
    }

    let (status, placed) = call(&f.app, "POST", "/api/v1/checkout", Some("buyer-1"), Some(json!({
        "items": [{ "product_id": pin_id, "quantity": 1 }], "buyer": buyer(), "promo_code": "PIN250", "payment_mode": "half"
    }))).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");
    assert_eq!(placed["order"]["total"], 1);
    assert_eq!(placed["plan"]["mode"], "full");
    assert_eq!(placed["plan"]["partial_available"], false);
    assert_eq!(placed["plan"]["charge_now"], 1);
    let (status, created) = call(&f.app, "POST", "/api/v1/payments/orders", Some("buyer-1"), Some(json!({ "order_id": placed["order"]["id"], "amount": 1 }))).await;
    assert_eq!(status, StatusCode::OK, "{created}");
    assert_eq!(created["order"]["amount"], 100);

    let (status, free) = call(&f.app, "POST", "/api/v1/checkout", Some("buyer-2"), Some(json!({
        "items": [{ "product_id": pin_id, "quantity": 1 }], "buyer": buyer(), "promo_code": "PINFREE", "payment_mode": "half"
    }))).await;
    assert_eq!(status, StatusCode::CREATED, "{free}");
    assert_eq!(free["order"]["total"], 0);
    assert_eq!(free["order"]["payment_status"], "completed");
    assert_eq!(free["order"]["status"], "processing");

    let (_, dashboard) = call(&f.app, "GET", "/api/v1/admin/dashboard", Some("admin-1"), None).await;
    assert_eq!(dashboard["pending_payments"], 1);
}

#[tokio::test]
async fn test_identity_and_permissions() {
    let f = fixture().await;
    let (status, _) = call(&f.app, "GET", "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&f.app, "GET", "/api/v1/orders", Some("ghost"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = call(&f.app, "GET", "/api/v1/admin/orders", Some("buyer-1"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, PERMISSION_DENIED_MESSAGE);

    let placed = place_half_order(&f).await;
    let order_id = placed["order"]["id"].as_str().unwrap();
    let (status, _) = call(&f.app, "GET", &format!("/api/v1/orders/{order_id}"), Some("buyer-2"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, mine) = call(&f.app, "GET", "/api/v1/orders", Some("buyer-2"), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 0);

    let request = Request::builder().uri("/api/v1/users/me").header("x-auth-error", "auth/too-many-requests").body(Body::empty()).unwrap();
    let response = f.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(!String::from_utf8_lossy(&text).contains("auth/"));
}

#[tokio::test]
async fn test_admin_status_machine() {
    let f = fixture().await;
    let placed = place_half_order(&f).await;
    let uri = format!("/api/v1/admin/orders/{}/status", placed["order"]["id"].as_str().unwrap());

    let (status, order) = call(&f.app, "PUT", &uri, Some("admin-1"), Some(json!({ "status": "shipped" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "shipped");
    let (status, _) = call(&f.app, "PUT", &uri, Some("admin-1"), Some(json!({ "status": "pending" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = call(&f.app, "PUT", &uri, Some("admin-1"), Some(json!({ "status": "teleported" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&f.app, "PUT", &uri, Some("admin-1"), Some(json!({ "status": "delivered" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, delivered) = call(&f.app, "GET", "/api/v1/admin/orders?status=delivered", Some("admin-1"), None).await;
    assert_eq!(delivered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_promo_preview_fails_soft() {
    let f = fixture().await;
    let (status, quote) = call(&f.app, "POST", "/api/v1/promos/apply", None, Some(json!({
        "items": [{ "product_id": f.coat_id, "quantity": 2 }], "code": "FRESHERS2025"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["promo"]["status"], "not_applicable");
    assert_eq!(quote["promo"]["discount"], 0);
    assert_eq!(quote["subtotal"], 700);

    let (_, quote) = call(&f.app, "POST", "/api/v1/promos/apply", None, Some(json!({
        "items": [{ "product_id": f.kit_id, "quantity": 1 }], "code": "nope"
    }))).await;
    assert_eq!(quote["promo"]["status"], "not_found");
    assert_eq!(quote["message"], "Invalid promo code");
}

#[tokio::test]
async fn test_sign_in_referral_and_user_count() {
    let f = fixture().await;
    let referrer = f.store.users().get("buyer-1").await.unwrap().unwrap();
    let (status, profile) = call(&f.app, "POST", "/api/v1/users/me", Some("new-1"), Some(json!({
        "email": "New@College.edu", "display_name": "Neha", "referral_code": referrer.referral_code().to_lowercase()
    }))).await;
    assert_eq!(status, StatusCode::OK, "{profile}");
    assert_eq!(profile["email"], "new@college.edu");
    assert_eq!(profile["role"], "user");
    assert_eq!(f.store.users().get("buyer-1").await.unwrap().unwrap().referral_count(), 1);

    call(&f.app, "POST", "/api/v1/users/me", Some("new-1"), Some(json!({ "email": "new@college.edu", "referral_code": referrer.referral_code() }))).await;
    assert_eq!(f.store.users().get("buyer-1").await.unwrap().unwrap().referral_count(), 1);

    let (status, count) = call(&f.app, "GET", "/api/v1/admin/user-count", Some("admin-1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count["count"], 4);

    let mut other_admin = UserProfile::register("admin-2", "staff@campus.store", "Staff", None);
    other_admin.set_role(Role::Admin);
    f.store.insert_user(other_admin).await;
    let (status, _) = call(&f.app, "GET", "/api/v1/admin/user-count", Some("admin-2"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&f.app, "PUT", "/api/v1/admin/users/buyer-2/role", Some("admin-2"), Some(json!({ "role": "admin" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, user) = call(&f.app, "PUT", "/api/v1/admin/users/buyer-2/role", Some("admin-1"), Some(json!({ "role": "admin" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["role"], "admin");
}
