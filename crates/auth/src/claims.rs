use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use gatehouse_core::AccountId;

use crate::Role;

/// Class of a signed token. Each class is signed with its own secret.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Access,
    Refresh,
}

impl core::fmt::Display for TokenClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenClass::Access => f.write_str("access"),
            TokenClass::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims carried by both token classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the account id, encoded as a string per RFC 7519.
    #[serde(with = "subject")]
    pub sub: AccountId,

    /// Role of the account at mint time.
    pub role: Role,

    pub typ: TokenClass,

    /// Unique token id; two tokens minted within the same second still differ.
    pub jti: Uuid,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiration (unix seconds).
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens in the issuer; this only checks `iat`/`exp`
/// against the supplied clock.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

mod subject {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use gatehouse_core::AccountId;

    pub fn serialize<S: Serializer>(id: &AccountId, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<AccountId, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(iat: DateTime<Utc>, ttl: Duration) -> TokenClaims {
        TokenClaims {
            sub: AccountId::new(1),
            role: Role::User,
            typ: TokenClass::Access,
            jti: Uuid::new_v4(),
            iat: iat.timestamp(),
            exp: (iat + ttl).timestamp(),
        }
    }

    #[test]
    fn valid_within_window() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims(now, Duration::minutes(15)), now), Ok(()));
    }

    #[test]
    fn expired_at_exp() {
        let now = Utc::now();
        let c = claims(now - Duration::minutes(15), Duration::minutes(15));
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::Expired));
    }

    #[test]
    fn future_iat_rejected() {
        let now = Utc::now();
        let c = claims(now + Duration::minutes(5), Duration::minutes(15));
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn inverted_window_rejected() {
        let now = Utc::now();
        let c = claims(now, Duration::seconds(-1));
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn subject_is_a_string_on_the_wire() {
        let c = claims(Utc::now(), Duration::minutes(1));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["sub"], "1");
        assert_eq!(json["typ"], "access");
        let back: TokenClaims = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
