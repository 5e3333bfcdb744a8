//! Promo Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::events::{DomainEvent, PromoEvent};
use crate::domain::value_objects::{Money, PromoCode};

/// Flat-amount promo. Codes are unique by convention only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Promo {
    id: String,
    code: PromoCode,
    amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eligible_product_ids: Option<Vec<String>>,
    active: bool,
    #[serde(default)]
    payment_option: PaymentOption,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Whether a promo lets the buyer split payment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOption { FullOnly, #[default] PartialAllowed }

#[derive(Clone, Debug, PartialEq)]
pub struct PromoDraft {
    pub code: PromoCode,
    pub amount: Money,
    pub eligible_product_ids: Option<Vec<String>>,
    pub active: bool,
    pub payment_option: PaymentOption,
}

impl Promo {
    pub fn create(draft: PromoDraft) -> Result<Self, PromoError> {
        let mut promo = Self {
            id: Uuid::new_v4().to_string(), code: draft.code.clone(), amount: Money::zero(),
            eligible_product_ids: None, active: false, payment_option: PaymentOption::default(),
            created_at: Utc::now(), events: vec![],
        };
        promo.apply(draft)?;
        Ok(promo)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn code(&self) -> &PromoCode { &self.code }
    pub fn amount(&self) -> Money { self.amount }
    pub fn is_active(&self) -> bool { self.active }
    pub fn payment_option(&self) -> PaymentOption { self.payment_option }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// `None` means every product is eligible. An empty list is treated the same way.
    pub fn eligible_product_ids(&self) -> Option<&[String]> {
        self.eligible_product_ids.as_deref().filter(|ids| !ids.is_empty())
    }

    pub fn applies_to(&self, product_id: &str) -> bool {
        self.eligible_product_ids().map_or(true, |ids| ids.iter().any(|id| id == product_id))
    }

    pub fn update(&mut self, draft: PromoDraft) -> Result<(), PromoError> { self.apply(draft) }

    fn apply(&mut self, draft: PromoDraft) -> Result<(), PromoError> {
        if !draft.amount.amount().is_positive() { return Err(PromoError::NonPositiveAmount); }
        self.code = draft.code;
        self.amount = draft.amount;
        self.eligible_product_ids = draft.eligible_product_ids;
        self.active = draft.active;
        self.payment_option = draft.payment_option;
        self.events.push(DomainEvent::Promo(PromoEvent::Saved { promo_id: self.id.clone(), code: self.code.to_string() }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PromoError { NonPositiveAmount }
impl std::error::Error for PromoError {}
impl std::fmt::Display for PromoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Promo amount must be positive") }
}
