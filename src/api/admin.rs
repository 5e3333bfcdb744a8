//! Admin screens: dashboard, order status machine, catalog, promos, featured
//! offer and users.

use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use validator::Validate;

use super::{AdminCaller, ApiResult, AppState};
use crate::domain::aggregates::{FeaturedOffer, Order, OrderStatus, PaymentOption, PaymentStatus, Product, ProductDraft, Promo, PromoDraft, Role, UserProfile};
use crate::domain::events::{DomainEvent, OrderEvent, ProductEvent, PromoEvent};
use crate::domain::value_objects::{Money, PromoCode};
use crate::repository::OrderFilter;
use crate::StoreError;

fn validated<T: Validate>(request: T) -> crate::Result<T> {
    request.validate().map_err(|e| StoreError::Validation(e.to_string()))?;
    Ok(request)
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_orders: usize,
    pub orders_by_status: BTreeMap<&'static str, usize>,
    pub pending_payments: usize,
    /// Totals of orders whose payment completed.
    pub revenue: Money,
    /// Second halves not yet collected on delivery.
    pub outstanding_due: Money,
    pub product_count: i64,
    pub user_count: i64,
}

impl Dashboard {
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut dashboard = Dashboard { total_orders: orders.len(), ..Default::default() };
        for status in OrderStatus::ALL { dashboard.orders_by_status.insert(status.as_str(), 0); }
        for order in orders {
            *dashboard.orders_by_status.entry(order.status().as_str()).or_default() += 1;
            match order.payment_status() {
                PaymentStatus::Completed => dashboard.revenue += order.total(),
                PaymentStatus::Pending => dashboard.pending_payments += 1,
                _ => {}
            }
            if order.status() != OrderStatus::Cancelled { dashboard.outstanding_due += order.outstanding_due(); }
        }
        dashboard
    }
}

pub async fn dashboard(State(s): State<AppState>, _admin: AdminCaller) -> ApiResult<Json<Dashboard>> {
    let orders = s.repos.orders.list(&OrderFilter::default()).await?;
    let mut dashboard = Dashboard::from_orders(&orders);
    dashboard.product_count = s.repos.products.count().await?;
    dashboard.user_count = s.repos.users.count().await?;
    Ok(Json(dashboard))
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)] pub struct OrderListParams { pub status: Option<String> }
#[derive(Debug, Deserialize)] pub struct StatusRequest { pub status: String }
#[derive(Debug, Deserialize)] pub struct PaymentStatusRequest { pub payment_status: PaymentStatus }

pub async fn list_orders(State(s): State<AppState>, _admin: AdminCaller, Query(p): Query<OrderListParams>) -> ApiResult<Json<Vec<Order>>> {
    let status = match p.status.as_deref().map(str::trim).filter(|v| !v.is_empty() && *v != "all") {
        Some(raw) => Some(raw.parse::<OrderStatus>().map_err(StoreError::from)?),
        None => None,
    };
    Ok(Json(s.repos.orders.list(&OrderFilter { user_id: None, status }).await?))
}

async fn load_order(s: &AppState, id: &str) -> crate::Result<Order> {
    s.repos.orders.get(id).await?.ok_or_else(|| StoreError::not_found("Order", id))
}

async fn save_order(s: &AppState, mut order: Order) -> crate::Result<Order> {
    s.repos.orders.save(&order).await?;
    s.events.publish(order.take_events()).await;
    Ok(order)
}

pub async fn update_order_status(State(s): State<AppState>, AdminCaller(admin): AdminCaller, Path(id): Path<String>, Json(r): Json<StatusRequest>) -> ApiResult<Json<Order>> {
    let next: OrderStatus = r.status.trim().parse().map_err(StoreError::from)?;
    let mut order = load_order(&s, &id).await?;
    let from = order.status();
    order.transition(next).map_err(StoreError::from)?;
    let order = save_order(&s, order).await?;
    info!(order_id = %id, admin_id = %admin.id(), %from, to = %next, "order status changed");
    Ok(Json(order))
}

pub async fn update_payment_status(State(s): State<AppState>, AdminCaller(admin): AdminCaller, Path(id): Path<String>, Json(r): Json<PaymentStatusRequest>) -> ApiResult<Json<Order>> {
    let mut order = load_order(&s, &id).await?;
    order.set_payment_status(r.payment_status).map_err(StoreError::from)?;
    let order = save_order(&s, order).await?;
    info!(order_id = %id, admin_id = %admin.id(), to = %r.payment_status, "payment status changed");
    Ok(Json(order))
}

pub async fn mark_remaining_received(State(s): State<AppState>, AdminCaller(admin): AdminCaller, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    let mut order = load_order(&s, &id).await?;
    let amount = order.mark_remaining_received().map_err(StoreError::from)?;
    let order = save_order(&s, order).await?;
    info!(order_id = %id, admin_id = %admin.id(), amount = amount.amount(), "remaining payment received");
    Ok(Json(order))
}

pub async fn delete_order(State(s): State<AppState>, AdminCaller(admin): AdminCaller, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if !s.repos.orders.delete(&id).await? { return Err(StoreError::not_found("Order", id).into()); }
    info!(order_id = %id, admin_id = %admin.id(), "order deleted");
    s.events.publish(vec![DomainEvent::Order(OrderEvent::Deleted { order_id: id })]).await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub original_price: Option<i64>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[validate(length(min = 1, max = 60))]
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub allow_partial_payment: bool,
}

fn default_true() -> bool { true }

impl From<ProductRequest> for ProductDraft {
    fn from(r: ProductRequest) -> Self {
        ProductDraft {
            name: r.name, description: r.description, price: Money::new(r.price),
            original_price: r.original_price.map(Money::new), in_stock: r.in_stock, category: r.category,
            images: r.images, features: r.features, allow_partial_payment: r.allow_partial_payment,
        }
    }
}

pub async fn create_product(State(s): State<AppState>, _admin: AdminCaller, Json(r): Json<ProductRequest>) -> ApiResult<(StatusCode, Json<Product>)> {
    let mut product = Product::create(validated(r)?.into()).map_err(StoreError::from)?;
    s.repos.products.save(&product).await?;
    s.events.publish(product.take_events()).await;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(State(s): State<AppState>, _admin: AdminCaller, Path(id): Path<String>, Json(r): Json<ProductRequest>) -> ApiResult<Json<Product>> {
    let draft: ProductDraft = validated(r)?.into();
    let mut product = s.repos.products.get(&id).await?.ok_or_else(|| StoreError::not_found("Product", &id))?;
    product.update(draft).map_err(StoreError::from)?;
    s.repos.products.save(&product).await?;
    s.events.publish(product.take_events()).await;
    Ok(Json(product))
}

pub async fn delete_product(State(s): State<AppState>, _admin: AdminCaller, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if !s.repos.products.delete(&id).await? { return Err(StoreError::not_found("Product", id).into()); }
    s.events.publish(vec![DomainEvent::Product(ProductEvent::Deleted { product_id: id })]).await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Promos
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct PromoRequest {
    #[validate(length(min = 1, max = 40))]
    pub code: String,
    #[validate(range(min = 1))]
    pub amount: i64,
    #[serde(default)]
    pub eligible_product_ids: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub payment_option: PaymentOption,
}

impl TryFrom<PromoRequest> for PromoDraft {
    type Error = StoreError;
    fn try_from(r: PromoRequest) -> Result<Self, Self::Error> {
        let code = PromoCode::parse(&r.code)
            .map_err(|e| StoreError::Validation(e.to_string()))?
            .ok_or_else(|| StoreError::Validation("Promo code is required".into()))?;
        Ok(PromoDraft { code, amount: Money::new(r.amount), eligible_product_ids: r.eligible_product_ids, active: r.active, payment_option: r.payment_option })
    }
}

pub async fn list_promos(State(s): State<AppState>, _admin: AdminCaller) -> ApiResult<Json<Vec<Promo>>> {
    Ok(Json(s.repos.promos.list().await?))
}

pub async fn create_promo(State(s): State<AppState>, _admin: AdminCaller, Json(r): Json<PromoRequest>) -> ApiResult<(StatusCode, Json<Promo>)> {
    let draft = PromoDraft::try_from(validated(r)?)?;
    let mut promo = Promo::create(draft).map_err(StoreError::from)?;
    s.repos.promos.save(&promo).await?;
    s.events.publish(promo.take_events()).await;
    Ok((StatusCode::CREATED, Json(promo)))
}

pub async fn update_promo(State(s): State<AppState>, _admin: AdminCaller, Path(id): Path<String>, Json(r): Json<PromoRequest>) -> ApiResult<Json<Promo>> {
    let draft = PromoDraft::try_from(validated(r)?)?;
    let mut promo = s.repos.promos.get(&id).await?.ok_or_else(|| StoreError::not_found("Promo", &id))?;
    promo.update(draft).map_err(StoreError::from)?;
    s.repos.promos.save(&promo).await?;
    s.events.publish(promo.take_events()).await;
    Ok(Json(promo))
}

pub async fn delete_promo(State(s): State<AppState>, _admin: AdminCaller, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if !s.repos.promos.delete(&id).await? { return Err(StoreError::not_found("Promo", id).into()); }
    s.events.publish(vec![DomainEvent::Promo(PromoEvent::Deleted { promo_id: id })]).await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Featured offer
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct FeaturedOfferRequest {
    pub enabled: bool,
    #[validate(length(max = 120))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 240))]
    pub subtitle: String,
    pub product_id: Option<String>,
    pub promo_code: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

pub async fn save_featured_offer(State(s): State<AppState>, _admin: AdminCaller, Json(r): Json<FeaturedOfferRequest>) -> ApiResult<Json<FeaturedOffer>> {
    let r = validated(r)?;
    if r.enabled && r.title.trim().is_empty() {
        return Err(StoreError::Validation("An enabled offer needs a title".into()).into());
    }
    let promo_code = match r.promo_code.as_deref() {
        Some(raw) => PromoCode::parse(raw).map_err(|e| StoreError::Validation(e.to_string()))?.map(String::from),
        None => None,
    };
    let offer = FeaturedOffer {
        enabled: r.enabled, title: r.title.trim().to_string(), subtitle: r.subtitle,
        product_id: r.product_id.filter(|p| !p.trim().is_empty()), promo_code, image_url: r.image_url,
        updated_at: Some(Utc::now()),
    };
    s.repos.settings.save_featured_offer(&offer).await?;
    Ok(Json(offer))
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Deserialize)] pub struct RoleRequest { pub role: String }
#[derive(Debug, Serialize)] pub struct UserCount { pub count: i64 }

pub async fn list_users(State(s): State<AppState>, _admin: AdminCaller) -> ApiResult<Json<Vec<UserProfile>>> {
    Ok(Json(s.repos.users.list().await?))
}

/// Superadmin only; nobody changes their own role.
pub async fn update_user_role(State(s): State<AppState>, AdminCaller(admin): AdminCaller, Path(id): Path<String>, Json(r): Json<RoleRequest>) -> ApiResult<Json<UserProfile>> {
    if !admin.is_superadmin() { return Err(StoreError::PermissionDenied.into()); }
    if admin.id() == id { return Err(StoreError::Validation("You cannot change your own role".into()).into()); }
    let role: Role = r.role.trim().to_lowercase().parse().map_err(StoreError::Validation)?;
    let mut user = s.repos.users.get(&id).await?.ok_or_else(|| StoreError::not_found("User", &id))?;
    let from = user.role();
    user.set_role(role);
    s.repos.users.save(&user).await?;
    info!(user_id = %id, admin_id = %admin.id(), %from, to = %role, "user role changed");
    Ok(Json(user))
}

/// Restricted to the single configured account, whatever its role.
pub async fn user_count(State(s): State<AppState>, AdminCaller(admin): AdminCaller) -> ApiResult<Json<UserCount>> {
    let allowed = s.config.user_count_admin_email.as_deref().is_some_and(|email| email == admin.email());
    if !allowed { return Err(StoreError::PermissionDenied.into()); }
    Ok(Json(UserCount { count: s.repos.users.count().await? }))
}
