use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::{debug, info};

use super::{ApiResult, AppState, Caller, Identity};
use crate::domain::aggregates::UserProfile;
use crate::StoreError;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// Upserts the caller's profile after sign-in. A referral code only counts on
/// the first sign-in, and never for the caller's own code.
pub async fn sign_in(State(s): State<AppState>, Identity(uid): Identity, Json(r): Json<SignInRequest>) -> ApiResult<Json<UserProfile>> {
    if let Some(mut existing) = s.repos.users.get(&uid).await? {
        if !r.display_name.trim().is_empty() && existing.display_name() != r.display_name.trim() {
            existing.set_display_name(r.display_name.trim());
            s.repos.users.save(&existing).await?;
        }
        return Ok(Json(existing));
    }
    if !r.email.contains('@') { return Err(StoreError::Validation("Please enter a valid email address".into()).into()); }

    let referral = r.referral_code.as_deref().map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty());
    let referrer = match &referral {
        Some(code) => s.repos.users.find_by_referral_code(code).await?.filter(|u| u.id() != uid),
        None => None,
    };
    if referral.is_some() && referrer.is_none() { debug!(user_id = %uid, "ignoring unknown referral code"); }

    let profile = UserProfile::register(&uid, &r.email, r.display_name.trim(), referrer.as_ref().map(|u| u.referral_code().to_string()));
    s.repos.users.save(&profile).await?;
    if let Some(mut referrer) = referrer {
        referrer.record_referral();
        s.repos.users.save(&referrer).await?;
        info!(user_id = %uid, referrer_id = %referrer.id(), "referral recorded");
    }
    info!(user_id = %uid, "user registered");
    Ok(Json(profile))
}

pub async fn me(Caller(user): Caller) -> Json<UserProfile> { Json(user) }
