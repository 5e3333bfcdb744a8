//! User profile linked to an authentication identity

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::value_objects::Money;

pub const REFERRAL_CODE_LEN: usize = 8;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProfile {
    id: String,
    email: String,
    #[serde(default)]
    display_name: String,
    role: Role,
    referral_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    referred_by: Option<String>,
    #[serde(default)]
    referral_count: u32,
    #[serde(default)]
    earnings: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] User, Admin, Superadmin }

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::User => "user", Self::Admin => "admin", Self::Superadmin => "superadmin" }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::Superadmin),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

impl UserProfile {
    /// New profile on first sign-in, always with the `user` role.
    pub fn register(id: impl Into<String>, email: impl Into<String>, display_name: impl Into<String>, referred_by: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(), email: email.into().trim().to_lowercase(), display_name: display_name.into(),
            role: Role::User, referral_code: generate_referral_code(), referred_by,
            referral_count: 0, earnings: Money::zero(), created_at: now, updated_at: now,
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn email(&self) -> &str { &self.email }
    pub fn display_name(&self) -> &str { &self.display_name }
    pub fn role(&self) -> Role { self.role }
    pub fn referral_code(&self) -> &str { &self.referral_code }
    pub fn referred_by(&self) -> Option<&str> { self.referred_by.as_deref() }
    pub fn referral_count(&self) -> u32 { self.referral_count }
    pub fn earnings(&self) -> Money { self.earnings }
    pub fn is_admin(&self) -> bool { matches!(self.role, Role::Admin | Role::Superadmin) }
    pub fn is_superadmin(&self) -> bool { self.role == Role::Superadmin }

    pub fn set_display_name(&mut self, name: impl Into<String>) { self.display_name = name.into(); self.touch(); }
    pub fn set_role(&mut self, role: Role) { self.role = role; self.touch(); }
    pub fn record_referral(&mut self) { self.referral_count = self.referral_count.saturating_add(1); self.touch(); }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

pub fn generate_referral_code() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(REFERRAL_CODE_LEN).map(char::from).collect::<String>().to_uppercase()
}
