//! Postgres-backed collections. Each collection is a table of JSONB documents
//! plus the handful of columns queries filter on.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{decode, encode, OrderFilter, OrderRepository, Page, ProductFilter, ProductRepository, PromoRepository, SettingsRepository, UserRepository};
use crate::domain::aggregates::{FeaturedOffer, Order, Product, Promo, UserProfile};
use crate::domain::value_objects::PromoCode;
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Json<serde_json::Value>,
}

impl DocumentRow {
    fn into_doc<T: serde::de::DeserializeOwned>(self, entity: &'static str) -> Result<T> {
        decode(entity, &self.id, self.data.0)
    }
}

fn decode_all<T: serde::de::DeserializeOwned>(entity: &'static str, rows: Vec<DocumentRow>) -> Result<Vec<T>> {
    rows.into_iter().map(|r| r.into_doc(entity)).collect()
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn get(&self, id: &str) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_doc("product")).transpose()
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Page<Product>> {
        const WHERE: &str = "WHERE ($1::text IS NULL OR category = $1) AND ($2::text IS NULL OR data->>'name' ILIKE '%' || $2 || '%' OR data->>'description' ILIKE '%' || $2 || '%')";
        let rows = sqlx::query_as::<_, DocumentRow>(&format!("SELECT id, data FROM products {WHERE} ORDER BY created_at DESC LIMIT $3 OFFSET $4"))
            .bind(&filter.category).bind(&filter.search).bind(filter.per_page as i64).bind(filter.offset() as i64)
            .fetch_all(&self.pool).await?;
        let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products {WHERE}"))
            .bind(&filter.category).bind(&filter.search)
            .fetch_one(&self.pool).await?;
        Ok(Page { data: decode_all("product", rows)?, total: total.0 })
    }

    async fn count(&self) -> Result<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(&self.pool).await?;
        Ok(total.0)
    }

    async fn save(&self, product: &Product) -> Result<()> {
        let data = encode("product", product.id(), product)?;
        sqlx::query("INSERT INTO products (id, category, data, created_at, updated_at) VALUES ($1, $2, $3, $4, NOW()) ON CONFLICT (id) DO UPDATE SET category = EXCLUDED.category, data = EXCLUDED.data, updated_at = NOW()")
            .bind(product.id()).bind(product.category()).bind(Json(data)).bind(product.created_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn get(&self, id: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM orders WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_doc("order")).transpose()
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM orders WHERE ($1::text IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2) ORDER BY created_at DESC")
            .bind(&filter.user_id).bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool).await?;
        decode_all("order", rows)
    }

    async fn save(&self, order: &Order) -> Result<()> {
        let data = encode("order", order.id(), order)?;
        sqlx::query("INSERT INTO orders (id, user_id, status, payment_status, data, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, payment_status = EXCLUDED.payment_status, data = EXCLUDED.data, updated_at = EXCLUDED.updated_at")
            .bind(order.id()).bind(order.user_id()).bind(order.status().as_str()).bind(order.payment_status().as_str())
            .bind(Json(data)).bind(order.created_at()).bind(order.updated_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let res = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl PromoRepository for PgStore {
    async fn get(&self, id: &str) -> Result<Option<Promo>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM promos WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_doc("promo")).transpose()
    }

    async fn find_by_code(&self, code: &PromoCode) -> Result<Option<Promo>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM promos WHERE code = $1 ORDER BY active DESC, created_at DESC LIMIT 1")
            .bind(code.as_str()).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_doc("promo")).transpose()
    }

    async fn list(&self) -> Result<Vec<Promo>> {
        let rows = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM promos ORDER BY created_at DESC").fetch_all(&self.pool).await?;
        decode_all("promo", rows)
    }

    async fn save(&self, promo: &Promo) -> Result<()> {
        let data = encode("promo", promo.id(), promo)?;
        sqlx::query("INSERT INTO promos (id, code, active, data, created_at) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (id) DO UPDATE SET code = EXCLUDED.code, active = EXCLUDED.active, data = EXCLUDED.data")
            .bind(promo.id()).bind(promo.code().as_str()).bind(promo.is_active()).bind(Json(data)).bind(promo.created_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let res = sqlx::query("DELETE FROM promos WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn get(&self, id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM users WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_doc("user")).transpose()
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM users WHERE referral_code = $1 LIMIT 1")
            .bind(code).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_doc("user")).transpose()
    }

    async fn list(&self) -> Result<Vec<UserProfile>> {
        let rows = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM users ORDER BY email").fetch_all(&self.pool).await?;
        decode_all("user", rows)
    }

    async fn count(&self) -> Result<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users").fetch_one(&self.pool).await?;
        Ok(total.0)
    }

    async fn save(&self, user: &UserProfile) -> Result<()> {
        let data = encode("user", user.id(), user)?;
        sqlx::query("INSERT INTO users (id, email, referral_code, data, created_at) VALUES ($1, $2, $3, $4, NOW()) ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, referral_code = EXCLUDED.referral_code, data = EXCLUDED.data")
            .bind(user.id()).bind(user.email()).bind(user.referral_code()).bind(Json(data))
            .execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for PgStore {
    async fn featured_offer(&self) -> Result<Option<FeaturedOffer>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM settings WHERE id = $1")
            .bind(FeaturedOffer::KEY).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_doc("settings")).transpose()
    }

    async fn save_featured_offer(&self, offer: &FeaturedOffer) -> Result<()> {
        let data = encode("settings", FeaturedOffer::KEY, offer)?;
        sqlx::query("INSERT INTO settings (id, data, updated_at) VALUES ($1, $2, NOW()) ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()")
            .bind(FeaturedOffer::KEY).bind(Json(data))
            .execute(&self.pool).await?;
        Ok(())
    }
}
