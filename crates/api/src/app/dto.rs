use serde::{Deserialize, Serialize};

use gatehouse_auth::{AccountProfile, TokenPair};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/refresh`. Without `refreshToken` the cookie is used.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// `GET /users?skip=&take=&search=&order=`; `order` is `field:direction`.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub skip: Option<u32>,
    pub take: Option<u32>,
    pub search: Option<String>,
    pub order: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AccountProfile,
}

impl LoginResponse {
    pub fn new(tokens: TokenPair, user: AccountProfile) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UsersPage {
    pub items: Vec<AccountProfile>,
    pub total: u64,
    pub count: usize,
    pub skip: u32,
    pub take: u32,
}
