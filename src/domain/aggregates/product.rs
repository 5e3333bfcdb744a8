//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::Money;

/// Catalog entry. Read-mostly; only admin screens write it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_price: Option<Money>,
    /// Percentage off `original_price`, for strikethrough display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    discount_percent: Option<u8>,
    in_stock: bool,
    category: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    allow_partial_payment: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Editable product fields, shared by create and update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub original_price: Option<Money>,
    pub in_stock: bool,
    pub category: String,
    pub images: Vec<String>,
    pub features: Vec<String>,
    pub allow_partial_payment: bool,
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        let now = Utc::now();
        let mut product = Self {
            id: Uuid::new_v4().to_string(), name: String::new(), description: String::new(),
            price: Money::zero(), original_price: None, discount_percent: None, in_stock: false, category: String::new(),
            images: vec![], features: vec![], allow_partial_payment: false,
            created_at: now, updated_at: now, events: vec![],
        };
        product.apply(draft)?;
        Ok(product)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn price(&self) -> Money { self.price }
    pub fn original_price(&self) -> Option<Money> { self.original_price }
    pub fn is_in_stock(&self) -> bool { self.in_stock }
    pub fn category(&self) -> &str { &self.category }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn allows_partial_payment(&self) -> bool { self.allow_partial_payment }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn discount_percent(&self) -> Option<u8> { self.discount_percent }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.description.to_lowercase().contains(&term) || self.category.to_lowercase().contains(&term)
    }

    pub fn update(&mut self, draft: ProductDraft) -> Result<(), ProductError> { self.apply(draft) }

    fn apply(&mut self, draft: ProductDraft) -> Result<(), ProductError> {
        if draft.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if draft.price.is_negative() { return Err(ProductError::NegativePrice); }
        if draft.original_price.is_some_and(|p| p.is_negative()) { return Err(ProductError::NegativePrice); }
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.price = draft.price;
        self.original_price = draft.original_price;
        self.discount_percent = percent_off(draft.price, draft.original_price);
        self.in_stock = draft.in_stock;
        self.category = draft.category.trim().to_lowercase();
        self.images = draft.images;
        self.features = draft.features;
        self.allow_partial_payment = draft.allow_partial_payment;
        self.touch();
        self.events.push(DomainEvent::Product(ProductEvent::Saved { product_id: self.id.clone() }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn percent_off(price: Money, original: Option<Money>) -> Option<u8> {
    let original = i128::from(original?.amount());
    let price = i128::from(price.amount());
    if original <= 0 || price >= original { return None; }
    u8::try_from((original - price) * 100 / original).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingName, NegativePrice }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::MissingName => write!(f, "Missing name"), Self::NegativePrice => write!(f, "Price cannot be negative") }
    }
}
