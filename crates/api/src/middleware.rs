use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use gatehouse_auth::CredentialValidator;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub validator: CredentialValidator,
}

/// Bearer strategy: resolve `Authorization: Bearer <access token>` into a
/// [`PrincipalContext`] or stop the request with 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let bearer = authorization(req.headers()).map(str::to_owned);
    let principal = state
        .validator
        .from_bearer(bearer.as_deref(), Utc::now())
        .await
        .map_err(errors::auth_error_to_response)?;

    req.extensions_mut().insert(PrincipalContext::new(principal));

    Ok(next.run(req).await)
}

/// Raw `Authorization` header value; non-UTF-8 counts as absent.
pub fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())
}
