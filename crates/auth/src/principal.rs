use serde::Serialize;

use gatehouse_core::AccountId;

use crate::{Account, Role};

/// Identity of an authenticated caller, scoped to a single request.
///
/// Derived from a verified token plus a fresh account lookup; never cached
/// across requests and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedPrincipal {
    pub account_id: AccountId,
    pub role: Role,
    pub email: String,
    pub name: Option<String>,
}

impl From<&Account> for AuthenticatedPrincipal {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            role: account.role,
            email: account.email.clone(),
            name: account.name.clone(),
        }
    }
}
