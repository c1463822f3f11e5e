//! Account model and its public projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_core::{AccountId, DomainError, DomainResult};

use crate::Role;

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

/// A stored account, including its opaque password hash.
///
/// # Invariants
/// - `email` is unique across accounts and stored normalized (trimmed, lowercase).
/// - `role` does not change after creation within this crate.
/// - `password_hash` never leaves the session boundary; use [`AccountProfile`]
///   for anything returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Input for creating an account (the store assigns the id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public account fields (`{id, email, name?, role, createdAt}` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: AccountId,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Input normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize an email for storage and lookup.
///
/// Lookups at login use the same normalization, so `" A@X.com "` and
/// `"a@x.com"` address the same account.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}

/// Blank names are treated as absent.
pub fn normalize_name(raw: Option<String>) -> Option<String> {
    raw.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.is_empty() {
        return Err(DomainError::validation("password cannot be empty"));
    }
    Ok(())
}
