//! `gatehouse-auth`: authentication/session boundary.
//!
//! This crate is decoupled from HTTP and from any concrete
//! storage engine: persistence is reached through the [`AccountStore`] and
//! [`RefreshTokenStore`] traits, implemented in `gatehouse-infra`.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod error;
pub mod hasher;
pub mod issuer;
pub mod principal;
pub mod refresh;
pub mod roles;
pub mod session;
pub mod store;

pub use account::{Account, AccountProfile, NewAccount};
pub use authorize::{AuthzError, require, require_self_or};
pub use claims::{TokenClaims, TokenClass, TokenValidationError, validate_claims};
pub use credentials::{CredentialValidator, REFRESH_COOKIE, extract_bearer};
pub use error::AuthError;
pub use hasher::{BcryptHasher, CredentialHasher, DEFAULT_BCRYPT_COST, HashError, Sha256Hasher};
pub use issuer::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, TokenError, TokenIssuer, TokenPair};
pub use principal::AuthenticatedPrincipal;
pub use refresh::RefreshTokens;
pub use roles::{Role, RoleSet};
pub use session::{LoginOutcome, SessionService};
pub use store::{
    AccountPage, AccountQuery, AccountStore, Page, RefreshTokenRecord, RefreshTokenStore, SortDirection, SortField,
    SortOrder, StoreError,
};
