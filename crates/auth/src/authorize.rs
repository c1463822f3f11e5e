use thiserror::Error;

use gatehouse_core::AccountId;

use crate::{AuthenticatedPrincipal, Role, RoleSet};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role {role} is not allowed")]
    Forbidden { role: Role },
}

/// Authorize a principal against an allow-list of roles.
///
/// - No IO
/// - No panics
/// - Pure set membership over the closed [`Role`] enumeration
pub fn require(principal: &AuthenticatedPrincipal, allowed: RoleSet) -> Result<(), AuthzError> {
    if allowed.contains(principal.role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { role: principal.role })
    }
}

/// Like [`require`], but the owner of `subject` is always allowed.
pub fn require_self_or(
    principal: &AuthenticatedPrincipal,
    subject: AccountId,
    allowed: RoleSet,
) -> Result<(), AuthzError> {
    if principal.account_id == subject {
        return Ok(());
    }
    require(principal, allowed)
}
