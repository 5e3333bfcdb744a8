//! Storefront settings documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `settings/featuredOffer`: the banner promoted on the storefront home page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturedOffer {
    pub enabled: bool,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FeaturedOffer {
    pub const KEY: &'static str = "featuredOffer";
}
