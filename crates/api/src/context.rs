use gatehouse_auth::{AuthenticatedPrincipal, Role};
use gatehouse_core::AccountId;

/// Principal context for a request (authenticated account + role).
///
/// Inserted by the bearer middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: AuthenticatedPrincipal,
}

impl PrincipalContext {
    pub fn new(principal: AuthenticatedPrincipal) -> Self {
        Self { principal }
    }

    pub fn account_id(&self) -> AccountId {
        self.principal.account_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn principal(&self) -> &AuthenticatedPrincipal {
        &self.principal
    }
}
