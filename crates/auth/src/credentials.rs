//! Credential validation pipeline (transport-agnostic core).
//!
//! Two extraction strategies feed the same verification:
//! - bearer: `Authorization: Bearer <access token>` for general API access
//! - cookie: the [`REFRESH_COOKIE`] refresh token, for refresh/logout only
//!
//! The HTTP layer pulls the raw header/cookie values and hands them here.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{AccountStore, AuthError, AuthenticatedPrincipal, TokenClass, TokenIssuer};

/// Name of the cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Extract the token from an `Authorization` header value.
///
/// Fails closed: anything other than exactly `"Bearer <token>"` (two
/// space-separated parts, non-empty token) yields `None`.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let mut parts = header?.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

#[derive(Clone)]
pub struct CredentialValidator {
    issuer: TokenIssuer,
    accounts: Arc<dyn AccountStore>,
}

impl CredentialValidator {
    pub fn new(issuer: TokenIssuer, accounts: Arc<dyn AccountStore>) -> Self {
        Self { issuer, accounts }
    }

    /// Bearer strategy: resolve the principal behind an access token.
    pub async fn from_bearer(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedPrincipal, AuthError> {
        let token = extract_bearer(authorization).ok_or(AuthError::Unauthenticated)?;
        self.authenticate(token, TokenClass::Access, now).await
    }

    /// Cookie strategy: resolve the principal behind a refresh token cookie.
    pub async fn from_refresh_cookie(
        &self,
        cookie: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedPrincipal, AuthError> {
        let token = cookie.filter(|t| !t.is_empty()).ok_or(AuthError::Unauthenticated)?;
        self.authenticate(token, TokenClass::Refresh, now).await
    }

    /// Verify `token` as `class` and load its subject.
    ///
    /// Invalid, expired and foreign-signed tokens are all `Unauthenticated`,
    /// as is a subject deleted after issuance. Store failures propagate as
    /// [`AuthError::Store`].
    pub async fn authenticate(
        &self,
        token: &str,
        class: TokenClass,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedPrincipal, AuthError> {
        let claims = self
            .issuer
            .verify(token, class, now)
            .map_err(|_| AuthError::Unauthenticated)?;

        let account = self
            .accounts
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                tracing::info!(account_id = %claims.sub, "token subject no longer exists");
                AuthError::Unauthenticated
            })?;

        Ok(AuthenticatedPrincipal::from(&account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn well_formed_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn malformed_bearer_fails_closed() {
        assert_eq!(extract_bearer(None), None);
        assert_eq!(extract_bearer(Some("")), None);
        assert_eq!(extract_bearer(Some("Bearer")), None);
        assert_eq!(extract_bearer(Some("Bearer ")), None);
        assert_eq!(extract_bearer(Some("bearer abc")), None);
        assert_eq!(extract_bearer(Some("Basic abc")), None);
        assert_eq!(extract_bearer(Some("Bearer a b")), None);
        assert_eq!(extract_bearer(Some("Bearer  abc")), None);
    }

    proptest! {
        #[test]
        fn any_spaceless_token_round_trips(token in "[A-Za-z0-9._-]{1,64}") {
            let header = format!("Bearer {token}");
            prop_assert_eq!(extract_bearer(Some(&header)), Some(token.as_str()));
        }

        #[test]
        fn other_schemes_never_match(scheme in "[A-Za-z]{1,10}", token in "[a-z]{1,10}") {
            prop_assume!(scheme != "Bearer");
            let header = format!("{scheme} {token}");
            prop_assert_eq!(extract_bearer(Some(&header)), None);
        }
    }
}
