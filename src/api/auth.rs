//! Caller identity.
//!
//! Sign-in happens at the authentication provider; the edge forwards the
//! verified uid as `x-user-id`, or the provider's error code as `x-auth-error`.

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use tracing::debug;

use super::AppState;
use crate::domain::aggregates::UserProfile;
use crate::StoreError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const AUTH_ERROR_HEADER: &str = "x-auth-error";

/// Provider error codes to buyer-facing text. Raw codes are never shown.
pub fn auth_error_message(code: &str) -> &'static str {
    match code.trim().trim_start_matches("auth/") {
        "wrong-password" | "invalid-credential" | "invalid-login-credentials" => "Incorrect email or password",
        "user-not-found" => "No account found with this email",
        "email-already-in-use" => "An account with this email already exists",
        "invalid-email" => "Please enter a valid email address",
        "weak-password" => "Password should be at least 6 characters",
        "too-many-requests" => "Too many attempts. Please wait a moment and try again",
        "network-request-failed" => "Network error. Check your connection and try again",
        "popup-closed-by-user" | "cancelled-popup-request" => "Sign-in was cancelled",
        "user-disabled" => "This account has been disabled. Please contact support",
        "id-token-expired" | "user-token-expired" => "Your session has expired. Please sign in again",
        _ => "Sign-in failed. Please try again",
    }
}

/// Verified uid; the profile may not exist yet (first sign-in).
#[derive(Clone, Debug)]
pub struct Identity(pub String);

/// Signed-in caller with a stored profile.
#[derive(Clone, Debug)]
pub struct Caller(pub UserProfile);

/// Caller with the admin or superadmin role.
#[derive(Clone, Debug)]
pub struct AdminCaller(pub UserProfile);

impl Caller {
    /// Owners see their own documents; admins see everything.
    pub fn can_view(&self, owner_id: &str) -> bool { self.0.id() == owner_id || self.0.is_admin() }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(code) = parts.headers.get(AUTH_ERROR_HEADER).and_then(|v| v.to_str().ok()) {
            debug!(code, "authentication provider reported an error");
            return Err((StatusCode::UNAUTHORIZED, auth_error_message(code).to_string()));
        }
        parts.headers.get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Identity(v.to_string()))
            .ok_or_else(|| StoreError::Unauthenticated.into())
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Identity(uid) = Identity::from_request_parts(parts, state).await?;
        let profile = state.repos.users.get(&uid).await?.ok_or(StoreError::Unauthenticated)?;
        Ok(Caller(profile))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Caller(profile) = Caller::from_request_parts(parts, state).await?;
        if !profile.is_admin() {
            debug!(user_id = %profile.id(), "admin route denied");
            return Err(StoreError::PermissionDenied.into());
        }
        Ok(AdminCaller(profile))
    }
}
