//! Discount resolution for promo codes.
//!
//! Discounts are flat amounts capped by the subtotal of the lines the promo is
//! eligible for, so a discount can never exceed the order value.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::domain::aggregates::{CartItem, LineItem, PaymentOption, Promo};
use crate::domain::value_objects::{Money, PromoCode};
use crate::repository::PromoRepository;

/// Anything with a product id and a line total can be discounted.
pub trait PricedLine {
    fn product_id(&self) -> &str;
    fn line_total(&self) -> Money;
}

impl PricedLine for LineItem {
    fn product_id(&self) -> &str { &self.product_id }
    fn line_total(&self) -> Money { LineItem::line_total(self) }
}

impl PricedLine for CartItem {
    fn product_id(&self) -> &str { &self.product_id }
    fn line_total(&self) -> Money { CartItem::line_total(self) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoStatus { NotProvided, Applied, NotFound, Inactive, NotApplicable }

impl PromoStatus {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotProvided => "",
            Self::Applied => "Promo code applied",
            Self::NotFound => "Invalid promo code",
            Self::Inactive => "This promo code is no longer active",
            Self::NotApplicable => "This promo code does not apply to the items in your cart",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscountOutcome {
    pub status: PromoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<PromoCode>,
    pub discount: Money,
    pub eligible_subtotal: Money,
    pub payment_option: PaymentOption,
}

impl DiscountOutcome {
    pub fn none(status: PromoStatus) -> Self {
        Self { status, code: None, discount: Money::zero(), eligible_subtotal: Money::zero(), payment_option: PaymentOption::PartialAllowed }
    }

    pub fn is_applied(&self) -> bool { self.status == PromoStatus::Applied }

    /// Callers switch the buyer to full payment when this is set.
    pub fn forces_full_payment(&self) -> bool {
        self.is_applied() && self.payment_option == PaymentOption::FullOnly
    }
}

/// `min(eligible subtotal, promo amount)`; zero when the promo is inactive or
/// nothing in the cart is eligible.
pub fn compute_discount<L: PricedLine>(lines: &[L], promo: &Promo) -> DiscountOutcome {
    if !promo.is_active() { return DiscountOutcome::none(PromoStatus::Inactive); }
    let eligible_subtotal: Money = lines.iter()
        .filter(|l| promo.applies_to(l.product_id()))
        .map(|l| l.line_total())
        .sum::<Money>()
        .clamp_non_negative();
    let discount = eligible_subtotal.min(promo.amount()).clamp_non_negative();
    if discount.is_zero() { return DiscountOutcome::none(PromoStatus::NotApplicable); }
    DiscountOutcome {
        status: PromoStatus::Applied,
        code: Some(promo.code().clone()),
        discount,
        eligible_subtotal,
        payment_option: promo.payment_option(),
    }
}

/// Looks promo codes up in the promo collection and prices them against a cart.
#[derive(Clone)]
pub struct DiscountResolver {
    promos: Arc<dyn PromoRepository>,
}

impl DiscountResolver {
    pub fn new(promos: Arc<dyn PromoRepository>) -> Self { Self { promos } }

    /// Fails soft: blank, malformed, unknown or inactive codes give a zero discount.
    pub async fn resolve<L: PricedLine + Sync>(&self, lines: &[L], raw_code: &str) -> crate::Result<DiscountOutcome> {
        let code = match PromoCode::parse(raw_code) {
            Ok(Some(code)) => code,
            Ok(None) => return Ok(DiscountOutcome::none(PromoStatus::NotProvided)),
            Err(_) => return Ok(DiscountOutcome::none(PromoStatus::NotFound)),
        };
        let Some(promo) = self.promos.find_by_code(&code).await? else {
            debug!(code = %code, "promo code not found");
            return Ok(DiscountOutcome::none(PromoStatus::NotFound));
        };
        let outcome = compute_discount(lines, &promo);
        debug!(code = %code, status = ?outcome.status, discount = outcome.discount.amount(), "promo resolved");
        Ok(outcome)
    }
}
