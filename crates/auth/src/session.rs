//! Session service: register, credential check, login, refresh-and-rotate, logout.
//!
//! Session states per account:
//!
//! ```text
//! Anonymous ──login──▶ Authenticated(access valid)
//!                         │ access expires
//!                         ▼
//!                      Authenticated(refresh valid) ──refresh──▶ Authenticated(access valid)
//!                         │ logout / refresh expiry / rotation by another login
//!                         ▼
//!                      Anonymous
//! ```
//!
//! Single-session policy: every login and every refresh replaces the
//! account's refresh record, so at most one refresh token is live per account.
//! Two concurrent refreshes with the same token race on the store; whichever
//! `replace` commits last wins and the other caller's new refresh token fails
//! on its next use. That is the intended outcome of the policy.
//!
//! The refresh JWT and its record are stamped from the same `now` with the
//! same TTL, but the JWT `exp` is truncated to whole seconds. It therefore
//! lapses at or before the record's `expires_at`, and with a single clock a
//! presented token is rejected as `InvalidRefreshToken` before the record
//! expiry check can fire. That check only triggers for records whose
//! `expires_at` was shortened after issue.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use gatehouse_core::AccountId;

use crate::account::{normalize_email, normalize_name, validate_password};
use crate::{
    AccountProfile, AccountStore, AuthError, CredentialHasher, NewAccount, RefreshTokenStore, RefreshTokens, Role,
    TokenClass, TokenIssuer, TokenPair,
};

/// Verified against when the email is unknown, so both login failure paths
/// perform one password hash comparison.
const TIMING_DUMMY_PASSWORD: &str = "gatehouse-timing-equalizer";

/// Result of a successful email/password login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub account: AccountProfile,
}

#[derive(Clone)]
pub struct SessionService {
    accounts: Arc<dyn AccountStore>,
    refresh_tokens: RefreshTokens,
    issuer: TokenIssuer,
    passwords: Arc<dyn CredentialHasher>,
    dummy_password_hash: Arc<str>,
}

impl SessionService {
    pub async fn new(
        accounts: Arc<dyn AccountStore>,
        refresh_store: Arc<dyn RefreshTokenStore>,
        issuer: TokenIssuer,
        passwords: Arc<dyn CredentialHasher>,
        token_hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self, AuthError> {
        let dummy_password_hash = passwords.hash(TIMING_DUMMY_PASSWORD).await?;
        let refresh_tokens = RefreshTokens::new(refresh_store, token_hasher, issuer.refresh_ttl());

        Ok(Self {
            accounts,
            refresh_tokens,
            issuer,
            passwords,
            dummy_password_hash: dummy_password_hash.into(),
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn accounts(&self) -> &Arc<dyn AccountStore> {
        &self.accounts
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration & credentials
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an account with role USER.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AccountProfile, AuthError> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.passwords.hash(password).await?;

        // A concurrent registration can still win the unique index; the store
        // reports that as DuplicateEmail too.
        let account = self
            .accounts
            .create(NewAccount {
                email,
                password_hash,
                name: normalize_name(name),
                role: Role::User,
                created_at: now,
            })
            .await?;

        tracing::info!(account_id = %account.id, "account registered");
        Ok(account.profile())
    }

    /// Check an email/password pair.
    ///
    /// `None` for both an unknown email and a wrong password. An unknown email
    /// still verifies against a dummy hash to keep the two paths equally slow.
    pub async fn validate_credentials(&self, email: &str, password: &str) -> Result<Option<AccountProfile>, AuthError> {
        let Ok(email) = normalize_email(email) else {
            self.passwords.verify(&self.dummy_password_hash, password).await?;
            return Ok(None);
        };

        let Some(account) = self.accounts.find_by_email(&email).await? else {
            self.passwords.verify(&self.dummy_password_hash, password).await?;
            return Ok(None);
        };

        if self.passwords.verify(&account.password_hash, password).await? {
            Ok(Some(account.profile()))
        } else {
            Ok(None)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a token pair and make its refresh half the account's only live one.
    pub async fn login(&self, account_id: AccountId, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccessDenied)?;

        let tokens = self.mint(account.id, account.role, now)?;
        self.refresh_tokens.replace(account.id, &tokens.refresh_token, now).await?;

        tracing::info!(account_id = %account.id, "session started");
        Ok(tokens)
    }

    /// [`validate_credentials`](Self::validate_credentials) then [`login`](Self::login).
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        let account = self
            .validate_credentials(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let tokens = self.login(account.id, now).await?;
        Ok(LoginOutcome { tokens, account })
    }

    /// Exchange a refresh token for a new pair, rotating the stored record.
    ///
    /// The presented token is unusable afterwards: a replay finds either no
    /// record or a record whose hash no longer matches, both `AccessDenied`.
    pub async fn refresh(&self, raw_refresh_token: &str, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let claims = self
            .issuer
            .verify(raw_refresh_token, TokenClass::Refresh, now)
            .map_err(|_| reject(None, AuthError::InvalidRefreshToken))?;
        let account_id = claims.sub;

        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| reject(Some(account_id), AuthError::AccessDenied))?;

        let record = self
            .refresh_tokens
            .find_active(account_id)
            .await?
            .ok_or_else(|| reject(Some(account_id), AuthError::AccessDenied))?;

        if !self.refresh_tokens.matches(&record, raw_refresh_token).await? {
            return Err(reject(Some(account_id), AuthError::AccessDenied));
        }

        if record.is_expired(now) {
            self.refresh_tokens.delete(record.id).await?;
            return Err(reject(Some(account_id), AuthError::RefreshTokenExpired));
        }

        let tokens = self.mint(account.id, account.role, now)?;
        self.refresh_tokens.replace(account.id, &tokens.refresh_token, now).await?;

        tracing::debug!(account_id = %account.id, "refresh token rotated");
        Ok(tokens)
    }

    /// Revoke the account's refresh token. Idempotent.
    pub async fn logout(&self, account_id: AccountId) -> Result<(), AuthError> {
        self.refresh_tokens.revoke_all(account_id).await?;
        tracing::info!(account_id = %account_id, "session ended");
        Ok(())
    }

    fn mint(&self, account_id: AccountId, role: Role, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        self.issuer.issue(account_id, role, now).map_err(AuthError::Token)
    }
}

fn reject(account_id: Option<AccountId>, err: AuthError) -> AuthError {
    match account_id {
        Some(id) => tracing::warn!(account_id = %id, reason = %err, "refresh rejected"),
        None => tracing::warn!(reason = %err, "refresh rejected"),
    }
    err
}
