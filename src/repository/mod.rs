//! Document collections: `products`, `orders`, `promos`, `users`, `settings`.
//!
//! The store is the single source of truth. Writes are whole-document upserts
//! with last-write-wins semantics; there are no concurrency tokens.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use crate::domain::aggregates::{FeaturedOffer, Order, OrderStatus, Product, Promo, UserProfile};
use crate::domain::value_objects::PromoCode;
use crate::{Result, StoreError};

pub mod memory;
pub mod postgres;

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl ProductFilter {
    pub fn offset(&self) -> usize { (self.page.max(1) as usize - 1) * self.per_page as usize }
}

#[derive(Clone, Debug, Default)]
pub struct OrderFilter {
    pub user_id: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self { Self { user_id: Some(user_id.into()), status: None } }
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.as_deref().map_or(true, |u| order.user_id() == u) && self.status.map_or(true, |s| order.status() == s)
    }
}

#[derive(Clone, Debug)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Product>>;
    async fn list(&self, filter: &ProductFilter) -> Result<Page<Product>>;
    async fn count(&self) -> Result<i64>;
    async fn save(&self, product: &Product) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Order>>;
    /// Newest first.
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>>;
    async fn save(&self, order: &Order) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait PromoRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Promo>>;
    /// Codes are not unique; an active promo wins over inactive ones, then the newest.
    async fn find_by_code(&self, code: &PromoCode) -> Result<Option<Promo>>;
    async fn list(&self) -> Result<Vec<Promo>>;
    async fn save(&self, promo: &Promo) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<UserProfile>>;
    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserProfile>>;
    async fn list(&self) -> Result<Vec<UserProfile>>;
    async fn count(&self) -> Result<i64>;
    async fn save(&self, user: &UserProfile) -> Result<()>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn featured_offer(&self) -> Result<Option<FeaturedOffer>>;
    async fn save_featured_offer(&self, offer: &FeaturedOffer) -> Result<()>;
}

/// Collection handles injected into the HTTP layer.
#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub promos: Arc<dyn PromoRepository>,
    pub users: Arc<dyn UserRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Repositories {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self { products: store.clone(), orders: store.clone(), promos: store.clone(), users: store.clone(), settings: store }
    }

    pub fn in_memory(store: memory::MemoryStore) -> Self {
        Self { products: store.products(), orders: store.orders(), promos: store.promos(), users: store.users(), settings: store.settings() }
    }
}

pub(crate) fn encode<T: Serialize>(entity: &'static str, id: &str, doc: &T) -> Result<serde_json::Value> {
    serde_json::to_value(doc).map_err(|e| StoreError::Corrupt { entity, id: id.to_string(), reason: e.to_string() })
}

/// Documents are validated against the typed schema as they leave the store.
pub(crate) fn decode<T: DeserializeOwned>(entity: &'static str, id: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(entity, id, error = %e, "rejecting malformed document");
        StoreError::Corrupt { entity, id: id.to_string(), reason: e.to_string() }
    })
}
