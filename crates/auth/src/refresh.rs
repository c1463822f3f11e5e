use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use gatehouse_core::{AccountId, RefreshTokenId};

use crate::{AuthError, CredentialHasher, HashError, RefreshTokenRecord, RefreshTokenStore, StoreError, TokenError};

/// Refresh Token Store as seen by the session service: hashes raw tokens
/// before they reach persistence and stamps the record expiry.
#[derive(Clone)]
pub struct RefreshTokens {
    store: Arc<dyn RefreshTokenStore>,
    hasher: Arc<dyn CredentialHasher>,
    ttl: Duration,
}

impl RefreshTokens {
    pub fn new(store: Arc<dyn RefreshTokenStore>, hasher: Arc<dyn CredentialHasher>, ttl: Duration) -> Self {
        Self { store, hasher, ttl }
    }

    /// Make `raw_token` the account's only live refresh token
    /// (`expires_at = now + ttl`).
    pub async fn replace(
        &self,
        account_id: AccountId,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AuthError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Token(TokenError::Signing("refresh record expiry overflows the clock".into())))?;
        let record = RefreshTokenRecord {
            id: RefreshTokenId::new(),
            account_id,
            token_hash: self.hasher.hash(raw_token).await?,
            expires_at,
        };
        self.store.replace(record.clone()).await?;
        Ok(record)
    }

    pub async fn find_active(&self, account_id: AccountId) -> Result<Option<RefreshTokenRecord>, StoreError> {
        self.store.find_active(account_id).await
    }

    pub async fn matches(&self, record: &RefreshTokenRecord, raw_token: &str) -> Result<bool, HashError> {
        self.hasher.verify(&record.token_hash, raw_token).await
    }

    pub async fn delete(&self, id: RefreshTokenId) -> Result<(), StoreError> {
        self.store.delete(id).await
    }

    pub async fn revoke_all(&self, account_id: AccountId) -> Result<(), StoreError> {
        self.store.revoke_all(account_id).await
    }
}
