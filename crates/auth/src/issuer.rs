//! Token Issuer: mints and verifies the access/refresh token pair.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use gatehouse_core::AccountId;

use crate::{Role, TokenClaims, TokenClass, validate_claims};

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Access + refresh token, as handed to the client at mint time only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// Token values are bearer secrets.
impl core::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed, wrongly signed, wrong class, expired or not yet valid.
    #[error("invalid token")]
    InvalidToken,

    #[error("access and refresh tokens must use distinct, non-empty secrets")]
    WeakSecrets,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Clone)]
struct ClassKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl ClassKeys {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// Signs and verifies HS256 tokens, one secret per [`TokenClass`].
#[derive(Clone)]
pub struct TokenIssuer {
    access: ClassKeys,
    refresh: ClassKeys,
    validation: Validation,
}

impl TokenIssuer {
    /// Build an issuer with the default lifetimes (15 minutes / 7 days).
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Result<Self, TokenError> {
        Self::with_ttls(
            access_secret,
            refresh_secret,
            Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
        )
    }

    pub fn with_ttls(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, TokenError> {
        if access_secret.is_empty() || refresh_secret.is_empty() || access_secret == refresh_secret {
            return Err(TokenError::WeakSecrets);
        }

        // Expiry is checked by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            access: ClassKeys::new(access_secret, access_ttl),
            refresh: ClassKeys::new(refresh_secret, refresh_ttl),
            validation,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access.ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl
    }

    fn keys(&self, class: TokenClass) -> &ClassKeys {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    /// Mint a fresh access/refresh pair for `account_id`.
    pub fn issue(&self, account_id: AccountId, role: Role, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.sign(account_id, role, TokenClass::Access, now)?,
            refresh_token: self.sign(account_id, role, TokenClass::Refresh, now)?,
        })
    }

    fn sign(
        &self,
        account_id: AccountId,
        role: Role,
        class: TokenClass,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let keys = self.keys(class);
        let expires_at = now
            .checked_add_signed(keys.ttl)
            .ok_or_else(|| TokenError::Signing(format!("{class} token lifetime overflows the clock")))?;
        let claims = TokenClaims {
            sub: account_id,
            role,
            typ: class,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, class and time window of `token`.
    ///
    /// Every failure collapses into [`TokenError::InvalidToken`]; the cause is
    /// only visible at `debug` level.
    pub fn verify(&self, token: &str, expected: TokenClass, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.keys(expected).decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(class = %expected, error = %e, "token rejected");
                TokenError::InvalidToken
            })?;

        let claims = data.claims;
        if claims.typ != expected {
            tracing::debug!(class = %expected, found = %claims.typ, "token class mismatch");
            return Err(TokenError::InvalidToken);
        }

        validate_claims(&claims, now).map_err(|e| {
            tracing::debug!(class = %expected, error = %e, "token outside validity window");
            TokenError::InvalidToken
        })?;

        Ok(claims)
    }
}
