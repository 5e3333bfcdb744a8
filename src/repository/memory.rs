//! In-memory collections, used by tests and when no database is configured.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{OrderFilter, OrderRepository, Page, ProductFilter, ProductRepository, PromoRepository, SettingsRepository, UserRepository};
use crate::domain::aggregates::{FeaturedOffer, Order, Product, Promo, UserProfile};
use crate::domain::value_objects::PromoCode;
use crate::Result;

type Collection<T> = Arc<RwLock<HashMap<String, T>>>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    products: Collection<Product>,
    orders: Collection<Order>,
    promos: Collection<Promo>,
    users: Collection<UserProfile>,
    featured_offer: Arc<RwLock<Option<FeaturedOffer>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn products(&self) -> Arc<dyn ProductRepository> { Arc::new(self.clone()) }
    pub fn orders(&self) -> Arc<dyn OrderRepository> { Arc::new(self.clone()) }
    pub fn promos(&self) -> Arc<dyn PromoRepository> { Arc::new(self.clone()) }
    pub fn users(&self) -> Arc<dyn UserRepository> { Arc::new(self.clone()) }
    pub fn settings(&self) -> Arc<dyn SettingsRepository> { Arc::new(self.clone()) }

    pub async fn insert_product(&self, product: Product) { self.products.write().await.insert(product.id().to_string(), product); }
    pub async fn insert_promo(&self, promo: Promo) { self.promos.write().await.insert(promo.id().to_string(), promo); }
    pub async fn insert_user(&self, user: UserProfile) { self.users.write().await.insert(user.id().to_string(), user); }
    pub async fn insert_order(&self, order: Order) { self.orders.write().await.insert(order.id().to_string(), order); }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Product>> { Ok(self.products.read().await.get(id).cloned()) }

    async fn list(&self, filter: &ProductFilter) -> Result<Page<Product>> {
        let products = self.products.read().await;
        let mut matched: Vec<Product> = products.values()
            .filter(|p| filter.category.as_deref().map_or(true, |c| p.category() == c))
            .filter(|p| filter.search.as_deref().map_or(true, |s| p.matches_search(s)))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        let total = matched.len() as i64;
        let data = matched.into_iter().skip(filter.offset()).take(filter.per_page as usize).collect();
        Ok(Page { data, total })
    }

    async fn count(&self) -> Result<i64> { Ok(self.products.read().await.len() as i64) }

    async fn save(&self, product: &Product) -> Result<()> {
        self.products.write().await.insert(product.id().to_string(), product.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> { Ok(self.products.write().await.remove(id).is_some()) }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Order>> { Ok(self.orders.read().await.get(id).cloned()) }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.orders.read().await.values().filter(|o| filter.matches(o)).cloned().collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn save(&self, order: &Order) -> Result<()> {
        self.orders.write().await.insert(order.id().to_string(), order.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> { Ok(self.orders.write().await.remove(id).is_some()) }
}

#[async_trait]
impl PromoRepository for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Promo>> { Ok(self.promos.read().await.get(id).cloned()) }

    async fn find_by_code(&self, code: &PromoCode) -> Result<Option<Promo>> {
        let promos = self.promos.read().await;
        Ok(promos.values()
            .filter(|p| p.code() == code)
            .max_by_key(|p| (p.is_active(), p.created_at()))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Promo>> {
        let mut promos: Vec<Promo> = self.promos.read().await.values().cloned().collect();
        promos.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(promos)
    }

    async fn save(&self, promo: &Promo) -> Result<()> {
        self.promos.write().await.insert(promo.id().to_string(), promo.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> { Ok(self.promos.write().await.remove(id).is_some()) }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<UserProfile>> { Ok(self.users.read().await.get(id).cloned()) }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.read().await.values().find(|u| u.referral_code() == code).cloned())
    }

    async fn list(&self) -> Result<Vec<UserProfile>> {
        let mut users: Vec<UserProfile> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.email().cmp(b.email()));
        Ok(users)
    }

    async fn count(&self) -> Result<i64> { Ok(self.users.read().await.len() as i64) }

    async fn save(&self, user: &UserProfile) -> Result<()> {
        self.users.write().await.insert(user.id().to_string(), user.clone());
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn featured_offer(&self) -> Result<Option<FeaturedOffer>> { Ok(self.featured_offer.read().await.clone()) }

    async fn save_featured_offer(&self, offer: &FeaturedOffer) -> Result<()> {
        *self.featured_offer.write().await = Some(offer.clone());
        Ok(())
    }
}
