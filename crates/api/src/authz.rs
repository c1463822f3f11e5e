//! API-side authorization guard.
//!
//! Handlers call these before touching any store; a failure is a ready-made
//! 403 response.

use axum::response::Response;

use gatehouse_auth::{AuthError, RoleSet, require, require_self_or};
use gatehouse_core::AccountId;

use crate::app::errors;
use crate::context::PrincipalContext;

/// Allow only principals whose role is in `allowed`.
pub fn authorize(principal: &PrincipalContext, allowed: RoleSet) -> Result<(), Response> {
    require(principal.principal(), allowed).map_err(|e| {
        tracing::info!(account_id = %principal.account_id(), role = %principal.role(), error = %e, "authorization denied");
        errors::auth_error_to_response(AuthError::from(e))
    })
}

/// Allow the owner of `subject`, or any principal whose role is in `allowed`.
pub fn authorize_self_or(principal: &PrincipalContext, subject: AccountId, allowed: RoleSet) -> Result<(), Response> {
    require_self_or(principal.principal(), subject, allowed).map_err(|e| {
        tracing::info!(
            account_id = %principal.account_id(),
            role = %principal.role(),
            subject = %subject,
            error = %e,
            "authorization denied"
        );
        errors::auth_error_to_response(AuthError::from(e))
    })
}
