use axum::{extract::{Path, State}, Json};

use super::{ApiResult, AppState, Caller};
use crate::domain::aggregates::Order;
use crate::repository::OrderFilter;
use crate::StoreError;

pub async fn list_my_orders(State(s): State<AppState>, Caller(user): Caller) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.repos.orders.list(&OrderFilter::for_user(user.id())).await?))
}

pub async fn get_order(State(s): State<AppState>, caller: Caller, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    Ok(Json(load_visible(&s, &caller, &id).await?))
}

/// Loads an order the caller may see: their own, or any order for admins.
pub(crate) async fn load_visible(s: &AppState, caller: &Caller, id: &str) -> crate::Result<Order> {
    let order = s.repos.orders.get(id).await?.ok_or_else(|| StoreError::not_found("Order", id))?;
    if !caller.can_view(order.user_id()) { return Err(StoreError::PermissionDenied); }
    Ok(order)
}
