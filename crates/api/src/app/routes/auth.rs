use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;

use gatehouse_auth::{AccountStore, AuthError, REFRESH_COOKIE, TokenPair};

use crate::app::services::{AppServices, CookiePolicy};
use crate::app::{dto, errors};
use crate::context::PrincipalContext;
use crate::middleware::authorization;

const COOKIE_PATH: &str = "/";

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    match services
        .sessions
        .register(&body.email, &body.password, body.name, Utc::now())
        .await
    {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    jar: CookieJar,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services
        .sessions
        .login_with_password(&body.email, &body.password, Utc::now())
        .await
    {
        Ok(outcome) => {
            let jar = jar.add(refresh_cookie(&outcome.tokens, services.cookie));
            (jar, Json(dto::LoginResponse::new(outcome.tokens, outcome.account))).into_response()
        }
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// Body token wins; otherwise the refresh cookie.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    jar: CookieJar,
    body: Bytes,
) -> axum::response::Response {
    let request = match parse_refresh_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };

    let raw = request
        .refresh_token
        .filter(|t| !t.is_empty())
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()));
    let Some(raw) = raw else {
        return errors::auth_error_to_response(AuthError::InvalidRefreshToken);
    };

    match services.sessions.refresh(&raw, Utc::now()).await {
        Ok(tokens) => {
            let jar = jar.add(refresh_cookie(&tokens, services.cookie));
            (jar, Json(tokens)).into_response()
        }
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// Principal from the bearer token, or from the refresh cookie when no
/// `Authorization` header is sent.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match authorization(&headers) {
        Some(header) => services.validator.from_bearer(Some(header), now).await,
        None => {
            let cookie = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
            services.validator.from_refresh_cookie(cookie.as_deref(), now).await
        }
    };

    let result = match principal {
        Ok(p) => services.sessions.logout(p.account_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            let jar = jar.remove(Cookie::build(REFRESH_COOKIE).path(COOKIE_PATH));
            (jar, Json(dto::LogoutResponse { success: true })).into_response()
        }
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.sessions.accounts().find_by_id(principal.account_id()).await {
        Ok(Some(account)) => Json(account.profile()).into_response(),
        Ok(None) => errors::auth_error_to_response(AuthError::Unauthenticated),
        Err(e) => errors::auth_error_to_response(e.into()),
    }
}

fn parse_refresh_body(body: &[u8]) -> Result<dto::RefreshRequest, axum::response::Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(dto::RefreshRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", format!("invalid request body: {e}"))
    })
}

fn refresh_cookie(tokens: &TokenPair, policy: CookiePolicy) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, tokens.refresh_token.clone()))
        .path(COOKIE_PATH)
        .http_only(true)
        .secure(policy.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(policy.max_age.num_seconds()))
        .build()
}
