//! Value Objects for the storefront

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Whole-unit money amount. The storefront prices in whole rupees; the gateway
/// is the only place minor units appear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn new(amount: i64) -> Self { Self(amount) }
    pub const fn zero() -> Self { Self(0) }
    pub const fn amount(&self) -> i64 { self.0 }
    pub const fn is_zero(&self) -> bool { self.0 == 0 }
    pub const fn is_negative(&self) -> bool { self.0 < 0 }

    pub fn multiply(&self, qty: u32) -> Money { Money(self.0.saturating_mul(i64::from(qty))) }
    pub fn saturating_sub(&self, other: Money) -> Money { Money(self.0.saturating_sub(other.0)) }
    pub fn min(self, other: Money) -> Money { if self <= other { self } else { other } }
    pub fn clamp_non_negative(self) -> Money { Money(self.0.max(0)) }

    /// floor(amount / 2), for non-negative amounts.
    pub fn half_floor(&self) -> Money { Money(self.0.max(0).div_euclid(2)) }

    /// Amount in the currency's minor unit (paise for INR).
    pub fn to_minor_units(&self) -> i64 { self.0.saturating_mul(100) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0.saturating_add(rhs.0)) }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) { *self = *self + rhs; }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::zero(), |acc, m| acc + m) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "₹{}", self.0) }
}

/// Promo code, normalised to trimmed uppercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PromoCode(String);

pub const MAX_PROMO_CODE_LEN: usize = 40;

impl PromoCode {
    /// Returns `Ok(None)` for blank input.
    pub fn parse(raw: &str) -> Result<Option<Self>, PromoCodeError> {
        let value = raw.trim().to_uppercase();
        if value.is_empty() { return Ok(None); }
        if value.chars().count() > MAX_PROMO_CODE_LEN { return Err(PromoCodeError::TooLong); }
        Ok(Some(Self(value)))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for PromoCode {
    type Error = PromoCodeError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        PromoCode::parse(&value)?.ok_or(PromoCodeError::Empty)
    }
}

impl From<PromoCode> for String {
    fn from(code: PromoCode) -> String { code.0 }
}

impl fmt::Display for PromoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PromoCodeError { Empty, TooLong }
impl std::error::Error for PromoCodeError {}
impl fmt::Display for PromoCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "Promo code empty"), Self::TooLong => write!(f, "Promo code too long") }
    }
}

/// Line quantity value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

pub const MAX_LINE_QUANTITY: u32 = 99;

impl Quantity {
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        if value > MAX_LINE_QUANTITY { return Err(QuantityError::TooLarge); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Quantity::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { Zero, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "Quantity must be at least 1"),
            Self::TooLarge => write!(f, "Quantity cannot exceed {MAX_LINE_QUANTITY}"),
        }
    }
}
