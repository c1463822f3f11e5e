use thiserror::Error;

use gatehouse_core::DomainError;

use crate::{AuthzError, HashError, StoreError, TokenError};

/// Outcome taxonomy of the session boundary.
///
/// All variants are terminal for the request; nothing in this crate retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("email already registered")]
    DuplicateEmail,

    /// Unknown email and wrong password are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("access denied")]
    AccessDenied,

    #[error("refresh token expired")]
    RefreshTokenExpired,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Hashing(#[from] HashError),

    #[error(transparent)]
    Token(TokenError),
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            other => AuthError::Store(other),
        }
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => AuthError::Validation(msg),
            DomainError::InvalidId(msg) => AuthError::Validation(msg),
        }
    }
}

impl From<AuthzError> for AuthError {
    fn from(_: AuthzError) -> Self {
        AuthError::Forbidden
    }
}
