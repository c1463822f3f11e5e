//! Persistence contracts consumed by the session boundary.
//!
//! Implementations live in `gatehouse-infra` (in-memory and Postgres).

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use gatehouse_core::{AccountId, DomainError, DomainResult, RefreshTokenId};

use crate::{Account, NewAccount};

/// Store operation error.
///
/// `Unavailable` is an infrastructure failure; it must never be read as
/// "no such account" or "no active session".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Offset pagination for account listings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub take: u32,
}

impl Page {
    pub const DEFAULT_TAKE: u32 = 20;
    pub const MAX_TAKE: u32 = 100;

    pub fn new(skip: Option<u32>, take: Option<u32>) -> Self {
        Self {
            skip: skip.unwrap_or(0),
            take: take.unwrap_or(Self::DEFAULT_TAKE).clamp(1, Self::MAX_TAKE),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    CreatedAt,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Listing order, written `field:direction` (`id:asc`, `createdAt:desc`, ...).
///
/// Ties on `createdAt` fall back to id in the same direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        let invalid = || DomainError::validation("order must be one of id:asc, id:desc, createdAt:asc, createdAt:desc");
        let (field, direction) = s.trim().split_once(':').ok_or_else(invalid)?;

        let field = if field.eq_ignore_ascii_case("id") {
            SortField::Id
        } else if field.eq_ignore_ascii_case("createdAt") {
            SortField::CreatedAt
        } else {
            return Err(invalid());
        };
        let direction = if direction.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else if direction.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            return Err(invalid());
        };

        Ok(Self { field, direction })
    }
}

/// Filter, order and window of an account listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountQuery {
    pub page: Page,
    /// Case-insensitive substring of email or name. Blank means no filter.
    pub search: Option<String>,
    pub order: SortOrder,
}

impl AccountQuery {
    pub fn new(page: Page, search: Option<String>, order: SortOrder) -> Self {
        Self {
            page,
            search: search.filter(|s| !s.trim().is_empty()),
            order,
        }
    }
}

/// One window of a listing; `total` counts every match, not just `items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPage {
    pub items: Vec<Account>,
    pub total: u64,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. Fails with [`StoreError::DuplicateEmail`] when the
    /// email is taken (including a concurrent insert that won the race).
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn list(&self, query: &AccountQuery) -> Result<AccountPage, StoreError>;
}

/// A persisted refresh token: the hash of the issued token, never the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: RefreshTokenId,
    pub account_id: AccountId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Exclusive owner of refresh token records.
///
/// # Invariants
/// - At most one record exists per account.
/// - `replace` is atomic: a concurrent `find_active` observes either the old
///   record or the new one, never an empty window. Concurrent `replace` calls
///   for one account resolve last-writer-wins.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Delete every record of `record.account_id`, then insert `record`.
    async fn replace(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    async fn find_active(&self, account_id: AccountId) -> Result<Option<RefreshTokenRecord>, StoreError>;

    async fn delete(&self, id: RefreshTokenId) -> Result<(), StoreError>;

    /// Delete every record of the account. Deleting nothing is not an error.
    async fn revoke_all(&self, account_id: AccountId) -> Result<(), StoreError>;
}
