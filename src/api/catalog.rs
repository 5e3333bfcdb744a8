use axum::{extract::{Path, Query, State}, Json};
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState};
use crate::domain::aggregates::{FeaturedOffer, Product};
use crate::repository::ProductFilter;
use crate::StoreError;

#[derive(Debug, Deserialize)] pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32>, pub category: Option<String>, pub search: Option<String> }
#[derive(Debug, Serialize)] pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: i64, pub page: u32 }

pub async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> ApiResult<Json<PaginatedResponse<Product>>> {
    let page = p.page.unwrap_or(1).max(1); let per_page = p.per_page.unwrap_or(20).clamp(1, 100);
    let filter = ProductFilter {
        category: p.category.map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty()),
        search: p.search.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
        page, per_page,
    };
    let result = s.repos.products.list(&filter).await?;
    Ok(Json(PaginatedResponse { data: result.data, total: result.total, page }))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Product>> {
    Ok(Json(s.repos.products.get(&id).await?.ok_or_else(|| StoreError::not_found("Product", id))?))
}

/// Disabled, empty offer when none has been configured.
pub async fn featured_offer(State(s): State<AppState>) -> ApiResult<Json<FeaturedOffer>> {
    Ok(Json(s.repos.settings.featured_offer().await?.unwrap_or_default()))
}
