//! Campus Storefront
//!
//! Order and payment service for a campus e-commerce storefront.
//!
//! ## Features
//! - Product catalog browsing and admin product management
//! - Local cart draft with durable client storage
//! - Checkout with promo codes and full or half (pay-rest-on-delivery) payment
//! - Payment gateway order creation, signature verification and webhooks
//! - Order tracking and the admin order status machine
//! - Admin dashboard, promo, featured offer and user management

use axum::http::StatusCode;
use thiserror::Error;

pub mod api;
pub mod checkout;
pub mod client;
pub mod config;
pub mod domain;
pub mod payment;
pub mod pricing;
pub mod publisher;
pub mod repository;

pub use config::AppConfig;
pub use domain::aggregates::{Order, OrderStatus, PaymentMode, PaymentStatus, Product, Promo, UserProfile};
pub use domain::value_objects::{Money, PromoCode};

/// Shown whenever the store denies an operation; the cause is logged, not returned.
pub const PERMISSION_DENIED_MESSAGE: &str = "You don't have permission to do this. Please contact support.";

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("Sign in required")]
    Unauthenticated,

    #[error("{}", PERMISSION_DENIED_MESSAGE)]
    PermissionDenied,

    #[error(transparent)]
    Order(#[from] domain::aggregates::OrderError),

    #[error(transparent)]
    Cart(#[from] domain::aggregates::CartError),

    #[error(transparent)]
    Product(#[from] domain::aggregates::ProductError),

    #[error(transparent)]
    Promo(#[from] domain::aggregates::PromoError),

    #[error(transparent)]
    Checkout(#[from] checkout::CheckoutError),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] payment::GatewayError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt {entity} document {id}: {reason}")]
    Corrupt { entity: &'static str, id: String, reason: String },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound { entity, id: id.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        use domain::aggregates::OrderError;
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::Cart(_) | Self::Product(_) | Self::Promo(_) | Self::Checkout(_) => StatusCode::BAD_REQUEST,
            Self::Order(OrderError::UnknownStatus(_)) | Self::Order(OrderError::NoItems) => StatusCode::BAD_REQUEST,
            Self::Order(_) => StatusCode::CONFLICT,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Corrupt { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for (StatusCode, String) {
    fn from(e: StoreError) -> Self {
        let status = e.status_code();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!(error = %e, "request failed");
        }
        let message = match &e {
            StoreError::Database(_) | StoreError::Corrupt { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (status, message)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
