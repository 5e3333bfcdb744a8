//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, Quantity, QuantityError};

/// Local cart draft. Owned by a single browser/device; never authoritative.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub allow_partial_payment: bool,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity.value()) }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Rebuilds a draft from its stored line items.
    pub fn from_items(items: Vec<CartItem>) -> Self { Self { items, updated_at: None } }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn updated_at(&self) -> Option<DateTime<Utc>> { self.updated_at }
    pub fn subtotal(&self) -> Money { self.items.iter().map(CartItem::line_total).sum() }

    /// Partial payment needs every line to allow it.
    pub fn is_partial_payment_eligible(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.allow_partial_payment)
    }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = Quantity::new(existing.quantity.value() + item.quantity.value())?;
        } else {
            self.items.push(item);
        }
        self.touch();
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.retain(|i| i.product_id != product_id); }
        else { item.quantity = Quantity::new(quantity)?; }
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.touch(); }

    fn touch(&mut self) { self.updated_at = Some(Utc::now()); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity(QuantityError) }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::ItemNotFound => write!(f, "Item not found"), Self::InvalidQuantity(e) => write!(f, "{e}") }
    }
}
impl From<QuantityError> for CartError {
    fn from(e: QuantityError) -> Self { CartError::InvalidQuantity(e) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: i64, qty: u32, partial: bool) -> CartItem {
        CartItem { product_id: id.into(), name: "Lab coat".into(), unit_price: Money::new(price), quantity: Quantity::new(qty).unwrap(), image: None, allow_partial_payment: partial }
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new();
        cart.add_item(item("P1", 350, 2, true)).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal(), Money::new(700));
        cart.add_item(item("P1", 350, 1, true)).unwrap();
        assert_eq!(cart.items()[0].quantity.value(), 3); // Merged
        cart.update_quantity("P1", 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item("P1"), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_partial_eligibility() {
        let mut cart = Cart::new();
        assert!(!cart.is_partial_payment_eligible());
        cart.add_item(item("P1", 1249, 1, true)).unwrap();
        assert!(cart.is_partial_payment_eligible());
        cart.add_item(item("P2", 99, 1, false)).unwrap();
        assert!(!cart.is_partial_payment_eligible());
    }

    #[test]
    fn test_merge_past_limit_rejected() {
        let mut cart = Cart::new();
        cart.add_item(item("P1", 10, 99, false)).unwrap();
        assert!(matches!(cart.add_item(item("P1", 10, 1, false)), Err(CartError::InvalidQuantity(_))));
        assert_eq!(cart.items()[0].quantity.value(), 99);
    }
}
