//! HTTP surface.

use axum::{routing::{delete, get, post, put}, Json, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::checkout::{CampusDirectory, Checkout};
use crate::payment::PaymentGateway;
use crate::pricing::DiscountResolver;
use crate::publisher::EventPublisher;
use crate::repository::Repositories;
use crate::AppConfig;

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod orders;
pub mod payments;
pub mod shop;
pub mod users;

pub use auth::{auth_error_message, AdminCaller, Caller, Identity};

pub type ApiResult<T> = Result<T, (axum::http::StatusCode, String)>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    pub gateway: Arc<dyn PaymentGateway>,
    pub events: EventPublisher,
    pub checkout: Checkout,
}

impl AppState {
    pub fn new(config: AppConfig, repos: Repositories, gateway: Arc<dyn PaymentGateway>, events: EventPublisher) -> Self {
        let campuses = Arc::new(CampusDirectory::parse(&config.multi_campus_colleges));
        let checkout = Checkout::new(repos.products.clone(), DiscountResolver::new(repos.promos.clone()), campuses);
        Self { config: Arc::new(config), repos, gateway, events, checkout }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "campus-storefront"})) }))
        .route("/api/v1/products", get(catalog::list_products))
        .route("/api/v1/products/:id", get(catalog::get_product))
        .route("/api/v1/featured-offer", get(catalog::featured_offer))
        .route("/api/v1/promos/apply", post(shop::apply_promo))
        .route("/api/v1/checkout", post(shop::checkout))
        .route("/api/v1/orders", get(orders::list_my_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/payments/orders", post(payments::create_gateway_order))
        .route("/api/v1/payments/verify", post(payments::verify_payment))
        .route("/api/v1/payments/webhook", post(payments::webhook))
        .route("/api/v1/users/me", get(users::me).post(users::sign_in))
        .route("/api/v1/admin/dashboard", get(admin::dashboard))
        .route("/api/v1/admin/orders", get(admin::list_orders))
        .route("/api/v1/admin/orders/:id", delete(admin::delete_order))
        .route("/api/v1/admin/orders/:id/status", put(admin::update_order_status))
        .route("/api/v1/admin/orders/:id/payment-status", put(admin::update_payment_status))
        .route("/api/v1/admin/orders/:id/remaining-payment", post(admin::mark_remaining_received))
        .route("/api/v1/admin/products", post(admin::create_product))
        .route("/api/v1/admin/products/:id", put(admin::update_product).delete(admin::delete_product))
        .route("/api/v1/admin/promos", get(admin::list_promos).post(admin::create_promo))
        .route("/api/v1/admin/promos/:id", put(admin::update_promo).delete(admin::delete_promo))
        .route("/api/v1/admin/featured-offer", put(admin::save_featured_offer))
        .route("/api/v1/admin/users", get(admin::list_users))
        .route("/api/v1/admin/users/:id/role", put(admin::update_user_role))
        .route("/api/v1/admin/user-count", get(admin::user_count))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}
