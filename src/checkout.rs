//! Checkout: buyer validation, payment plan selection and order composition.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::domain::aggregates::{BuyerDetails, LineItem, Order, PaymentMode};
use crate::domain::value_objects::{Money, Quantity};
use crate::pricing::{DiscountOutcome, DiscountResolver};
use crate::repository::ProductRepository;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please enter your {0}")]
    MissingField(&'static str),

    #[error("Please enter a valid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Product {0} is no longer available")]
    UnknownProduct(String),

    #[error("{0} is out of stock")]
    OutOfStock(String),

    #[error("Invalid quantity for {product}: {reason}")]
    InvalidQuantity { product: String, reason: String },
}

// =============================================================================
// Campus directory
// =============================================================================

/// Colleges that deliver to more than one campus. Buyers from these colleges
/// must pick one of the listed campuses.
#[derive(Clone, Debug, Default)]
pub struct CampusDirectory {
    colleges: HashMap<String, Vec<String>>,
}

impl CampusDirectory {
    /// Parses `College A:North|South;College B:Main|Annex`.
    pub fn parse(raw: &str) -> Self {
        let colleges = raw.split(';')
            .filter_map(|entry| {
                let (college, campuses) = entry.split_once(':')?;
                let campuses: Vec<String> = campuses.split('|').map(str::trim).filter(|c| !c.is_empty()).map(String::from).collect();
                let college = college.trim();
                (!college.is_empty() && !campuses.is_empty()).then(|| (college.to_lowercase(), campuses))
            })
            .collect();
        Self { colleges }
    }

    pub fn campuses_for(&self, college: &str) -> Option<&[String]> {
        self.colleges.get(&college.trim().to_lowercase()).map(Vec::as_slice)
    }
}

// =============================================================================
// Buyer validation
// =============================================================================

/// Checks buyer fields in form order and reports the first problem.
pub fn validate_buyer(buyer: &BuyerDetails, campuses: &CampusDirectory) -> Result<BuyerDetails, CheckoutError> {
    let name = required(&buyer.name, "full name")?;
    let phone = normalize_phone(&buyer.phone)?;
    let branch = required(&buyer.branch, "branch")?;
    let division = required(&buyer.division, "division")?;
    let college = required(&buyer.college, "college")?;
    let campus = match campuses.campuses_for(&college) {
        Some(allowed) => {
            let picked = buyer.campus.as_deref().map(str::trim).filter(|c| !c.is_empty()).ok_or(CheckoutError::MissingField("campus"))?;
            let matched = allowed.iter().find(|c| c.eq_ignore_ascii_case(picked)).ok_or_else(|| CheckoutError::InvalidField {
                field: "campus",
                reason: format!("choose one of {}", allowed.join(", ")),
            })?;
            Some(matched.clone())
        }
        None => buyer.campus.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(String::from),
    };
    let email = buyer.email.as_deref().map(str::trim).filter(|e| !e.is_empty()).map(String::from);
    if let Some(email) = &email {
        if !email.contains('@') {
            return Err(CheckoutError::InvalidField { field: "email", reason: "missing @".into() });
        }
    }
    Ok(BuyerDetails { name, phone, email, branch, division, college, campus })
}

fn required(value: &str, field: &'static str) -> Result<String, CheckoutError> {
    let value = value.trim();
    if value.is_empty() { return Err(CheckoutError::MissingField(field)); }
    Ok(value.to_string())
}

/// 10-digit mobile number, tolerating spaces, dashes and a +91 prefix.
pub fn normalize_phone(raw: &str) -> Result<String, CheckoutError> {
    let digits: String = raw.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')')).collect();
    if digits.is_empty() { return Err(CheckoutError::MissingField("phone number")); }
    let digits = digits.strip_prefix("+91").unwrap_or(&digits);
    let digits = if digits.len() == 12 { digits.strip_prefix("91").unwrap_or(digits) } else { digits };
    if digits.len() != 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CheckoutError::InvalidField { field: "phone number", reason: "must be 10 digits".into() });
    }
    Ok(digits.to_string())
}

// =============================================================================
// Payment plan
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentPlan {
    pub mode: PaymentMode,
    pub partial_available: bool,
    pub total: Money,
    pub charge_now: Money,
    pub due_later: Money,
}

impl PaymentPlan {
    /// Half payment needs an eligible cart, a promo that does not force full
    /// payment and a non-zero first half; anything else falls back to full.
    pub fn for_order(total: Money, cart_eligible: bool, promo_forces_full: bool, requested: PaymentMode) -> Self {
        let total = total.clamp_non_negative();
        let partial_available = cart_eligible && !promo_forces_full && !total.half_floor().is_zero();
        let mode = if partial_available { requested } else { PaymentMode::Full };
        match mode {
            PaymentMode::Full => Self { mode, partial_available, total, charge_now: total, due_later: Money::zero() },
            PaymentMode::Half => {
                let charge_now = total.half_floor();
                Self { mode, partial_available, total, charge_now, due_later: total.saturating_sub(charge_now) }
            }
        }
    }
}

// =============================================================================
// Order composer
// =============================================================================

#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    pub buyer: BuyerDetails,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub payment_mode: PaymentMode,
}

#[derive(Debug)]
pub struct CheckoutSummary {
    pub order: Order,
    pub plan: PaymentPlan,
    pub promo: DiscountOutcome,
}

#[derive(Clone, Debug, Serialize)]
pub struct Quote {
    pub lines: Vec<LineItem>,
    pub subtotal: Money,
    pub promo: DiscountOutcome,
    pub plan: PaymentPlan,
}

#[derive(Clone)]
pub struct Checkout {
    products: Arc<dyn ProductRepository>,
    resolver: DiscountResolver,
    campuses: Arc<CampusDirectory>,
}

impl Checkout {
    pub fn new(products: Arc<dyn ProductRepository>, resolver: DiscountResolver, campuses: Arc<CampusDirectory>) -> Self {
        Self { products, resolver, campuses }
    }

    /// Builds a pending order. Prices come from the catalog, never from the client.
    pub async fn compose(&self, user_id: &str, request: CheckoutRequest) -> crate::Result<CheckoutSummary> {
        if request.items.is_empty() { return Err(CheckoutError::EmptyCart.into()); }
        let buyer = validate_buyer(&request.buyer, &self.campuses)?;
        let Quote { lines, promo, plan, .. } = self
            .quote(request.items, request.promo_code.as_deref().unwrap_or_default(), request.payment_mode)
            .await?;
        let order = Order::compose(user_id, lines, buyer, promo.code.clone(), promo.discount, plan.mode)?;
        info!(order_id = %order.id(), user_id, total = order.total().amount(), mode = ?plan.mode, "order composed");
        Ok(CheckoutSummary { order, plan, promo })
    }

    /// Prices a cart and a promo code without creating anything.
    pub async fn quote(&self, items: Vec<CheckoutLine>, promo_code: &str, requested: PaymentMode) -> crate::Result<Quote> {
        if items.is_empty() { return Err(CheckoutError::EmptyCart.into()); }
        let mut lines: Vec<LineItem> = Vec::with_capacity(items.len());
        let mut cart_eligible = true;
        for requested in merge_lines(items) {
            let product = self.products.get(&requested.product_id).await?
                .ok_or_else(|| CheckoutError::UnknownProduct(requested.product_id.clone()))?;
            if !product.is_in_stock() { return Err(CheckoutError::OutOfStock(product.name().to_string()).into()); }
            let quantity = Quantity::new(requested.quantity)
                .map_err(|e| CheckoutError::InvalidQuantity { product: product.name().to_string(), reason: e.to_string() })?;
            cart_eligible &= product.allows_partial_payment();
            lines.push(LineItem {
                product_id: product.id().to_string(),
                name: product.name().to_string(),
                price: product.price(),
                quantity,
                image: product.images().first().cloned(),
            });
        }

        let promo = self.resolver.resolve(&lines, promo_code).await?;
        let subtotal: Money = lines.iter().map(LineItem::line_total).sum();
        let plan = PaymentPlan::for_order(subtotal.saturating_sub(promo.discount), cart_eligible, promo.forces_full_payment(), requested);
        Ok(Quote { lines, subtotal, promo, plan })
    }
}

/// Same product listed twice becomes one line.
fn merge_lines(items: Vec<CheckoutLine>) -> Vec<CheckoutLine> {
    let mut merged: Vec<CheckoutLine> = Vec::with_capacity(items.len());
    for item in items {
        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(item),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{OrderStatus, PaymentOption, PaymentStatus, Product, ProductDraft, Promo, PromoDraft};
    use crate::domain::value_objects::PromoCode;
    use crate::repository::memory::MemoryStore;
    use proptest::prelude::*;

    fn buyer() -> BuyerDetails {
        BuyerDetails {
            name: "Asha Rao".into(), phone: "+91 98765-43210".into(), email: None,
            branch: "Mechanical".into(), division: "B".into(), college: "Govt Engineering College".into(), campus: None,
        }
    }

    #[test]
    fn test_first_missing_field_reported() {
        let dir = CampusDirectory::default();
        let err = validate_buyer(&BuyerDetails { name: " ".into(), phone: String::new(), ..buyer() }, &dir).unwrap_err();
        assert_eq!(err, CheckoutError::MissingField("full name"));
        let err = validate_buyer(&BuyerDetails { phone: "12345".into(), ..buyer() }, &dir).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidField { field: "phone number", .. }));
        let err = validate_buyer(&BuyerDetails { division: String::new(), ..buyer() }, &dir).unwrap_err();
        assert_eq!(err.to_string(), "Please enter your division");
        assert_eq!(validate_buyer(&buyer(), &dir).unwrap().phone, "9876543210");
    }

    #[test]
    fn test_campus_required_for_multi_campus_college() {
        let dir = CampusDirectory::parse("Govt Engineering College: North | South ; Broken");
        assert_eq!(dir.campuses_for("govt engineering college").unwrap().len(), 2);
        assert_eq!(validate_buyer(&buyer(), &dir).unwrap_err(), CheckoutError::MissingField("campus"));
        let err = validate_buyer(&BuyerDetails { campus: Some("East".into()), ..buyer() }, &dir).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidField { field: "campus", .. }));
        let ok = validate_buyer(&BuyerDetails { campus: Some("south".into()), ..buyer() }, &dir).unwrap();
        assert_eq!(ok.campus.as_deref(), Some("South"));
    }

    #[test]
    fn test_half_payment_scenario() {
        let plan = PaymentPlan::for_order(Money::new(1000), true, false, PaymentMode::Half);
        assert_eq!((plan.charge_now, plan.due_later), (Money::new(500), Money::new(500)));
        let forced = PaymentPlan::for_order(Money::new(1000), true, true, PaymentMode::Half);
        assert_eq!(forced.mode, PaymentMode::Full);
        assert!(!forced.partial_available);
        assert_eq!(PaymentPlan::for_order(Money::new(1000), false, false, PaymentMode::Half).charge_now, Money::new(1000));
    }

    #[test]
    fn test_half_unavailable_when_first_half_is_zero() {
        let plan = PaymentPlan::for_order(Money::new(1), true, false, PaymentMode::Half);
        assert_eq!(plan.mode, PaymentMode::Full);
        assert!(!plan.partial_available);
        assert_eq!((plan.charge_now, plan.due_later), (Money::new(1), Money::zero()));
        let free = PaymentPlan::for_order(Money::zero(), true, false, PaymentMode::Half);
        assert_eq!((free.mode, free.charge_now), (PaymentMode::Full, Money::zero()));
    }

    proptest! {
        #[test]
        fn prop_half_plan_sums_to_total(total in 2i64..1_000_000) {
            let plan = PaymentPlan::for_order(Money::new(total), true, false, PaymentMode::Half);
            prop_assert_eq!(plan.charge_now + plan.due_later, Money::new(total));
            prop_assert_eq!(plan.charge_now.amount(), total / 2);
        }
    }

    async fn store_with_catalog() -> (MemoryStore, String, String) {
        let store = MemoryStore::new();
        let kit = Product::create(ProductDraft { name: "Drawing Kit".into(), price: Money::new(1249), in_stock: true, category: "kits".into(), allow_partial_payment: true, ..Default::default() }).unwrap();
        let coat = Product::create(ProductDraft { name: "Lab Coat".into(), price: Money::new(350), in_stock: true, category: "apparel".into(), ..Default::default() }).unwrap();
        let (kit_id, coat_id) = (kit.id().to_string(), coat.id().to_string());
        store.insert_product(kit).await;
        store.insert_product(coat).await;
        store.insert_promo(Promo::create(PromoDraft {
            code: PromoCode::parse("FRESHERS2025").unwrap().unwrap(), amount: Money::new(250),
            eligible_product_ids: Some(vec![kit_id.clone()]), active: true, payment_option: PaymentOption::PartialAllowed,
        }).unwrap()).await;
        (store, kit_id, coat_id)
    }

    fn checkout(store: &MemoryStore) -> Checkout {
        Checkout::new(store.products(), DiscountResolver::new(store.promos()), Arc::new(CampusDirectory::default()))
    }

    #[tokio::test]
    async fn test_compose_without_promo() {
        let (store, _, coat) = store_with_catalog().await;
        let request = CheckoutRequest { items: vec![CheckoutLine { product_id: coat, quantity: 1 }], buyer: buyer(), promo_code: None, payment_mode: PaymentMode::Half };
        let summary = checkout(&store).compose("U1", request).await.unwrap();
        assert_eq!(summary.order.discount(), Money::zero());
        assert_eq!(summary.order.total(), Money::new(350));
        assert_eq!(summary.plan.mode, PaymentMode::Full);
        assert_eq!(summary.order.status(), OrderStatus::Pending);
        assert_eq!(summary.order.payment_status(), PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_compose_with_promo_and_half_payment() {
        let (store, kit, _) = store_with_catalog().await;
        let request = CheckoutRequest { items: vec![CheckoutLine { product_id: kit, quantity: 1 }], buyer: buyer(), promo_code: Some("freshers2025".into()), payment_mode: PaymentMode::Half };
        let summary = checkout(&store).compose("U1", request).await.unwrap();
        assert_eq!(summary.order.discount(), Money::new(250));
        assert_eq!(summary.order.total(), Money::new(999));
        assert_eq!(summary.plan.charge_now, Money::new(499));
        assert_eq!(summary.order.charge_amount(), summary.plan.charge_now);
        assert_eq!(summary.order.outstanding_due(), summary.plan.due_later);
    }

    #[tokio::test]
    async fn test_compose_rejects_unknown_product_and_empty_cart() {
        let (store, _, _) = store_with_catalog().await;
        let empty = CheckoutRequest { items: vec![], buyer: buyer(), promo_code: None, payment_mode: PaymentMode::Full };
        assert!(matches!(checkout(&store).compose("U1", empty).await, Err(crate::StoreError::Checkout(CheckoutError::EmptyCart))));
        let unknown = CheckoutRequest { items: vec![CheckoutLine { product_id: "ghost".into(), quantity: 1 }], buyer: buyer(), promo_code: None, payment_mode: PaymentMode::Full };
        assert!(matches!(checkout(&store).compose("U1", unknown).await, Err(crate::StoreError::Checkout(CheckoutError::UnknownProduct(_)))));
    }

    #[tokio::test]
    async fn test_fully_discounted_order_is_settled() {
        let (store, kit, _) = store_with_catalog().await;
        store.insert_promo(Promo::create(PromoDraft {
            code: PromoCode::parse("ONTHEHOUSE").unwrap().unwrap(), amount: Money::new(5000),
            eligible_product_ids: None, active: true, payment_option: PaymentOption::PartialAllowed,
        }).unwrap()).await;
        let request = CheckoutRequest { items: vec![CheckoutLine { product_id: kit, quantity: 1 }], buyer: buyer(), promo_code: Some("ONTHEHOUSE".into()), payment_mode: PaymentMode::Half };
        let summary = checkout(&store).compose("U1", request).await.unwrap();
        assert_eq!(summary.order.total(), Money::zero());
        assert_eq!(summary.plan.mode, PaymentMode::Full);
        assert_eq!(summary.order.charge_amount(), Money::zero());
        assert_eq!(summary.order.payment_status(), PaymentStatus::Completed);
        assert_eq!(summary.order.status(), OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_quote_merges_lines_and_skips_ineligible_promo() {
        let (store, kit, coat) = store_with_catalog().await;
        let items = vec![
            CheckoutLine { product_id: coat.clone(), quantity: 1 },
            CheckoutLine { product_id: coat, quantity: 2 },
        ];
        let quote = checkout(&store).quote(items, "FRESHERS2025", PaymentMode::Full).await.unwrap();
        assert_eq!(quote.lines.len(), 1);
        assert_eq!(quote.subtotal, Money::new(1050));
        assert_eq!(quote.promo.status, crate::pricing::PromoStatus::NotApplicable);
        let quote = checkout(&store).quote(vec![CheckoutLine { product_id: kit, quantity: 1 }], "", PaymentMode::Half).await.unwrap();
        assert_eq!(quote.plan.charge_now, Money::new(624));
    }
}
