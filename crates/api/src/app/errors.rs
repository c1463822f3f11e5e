use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gatehouse_auth::AuthError;

/// Single message for every refresh-path failure, so callers cannot tell
/// which check rejected the token.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied";

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::DuplicateEmail => json_error(StatusCode::CONFLICT, "duplicate_email", "email already registered"),
        AuthError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid email or password")
        }
        AuthError::InvalidRefreshToken | AuthError::AccessDenied | AuthError::RefreshTokenExpired => {
            json_error(StatusCode::FORBIDDEN, "access_denied", ACCESS_DENIED_MESSAGE)
        }
        AuthError::Unauthenticated => json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "unauthenticated"),
        AuthError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        AuthError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AuthError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", "service temporarily unavailable")
        }
        AuthError::Hashing(e) => {
            tracing::error!(error = %e, "hashing failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
        AuthError::Token(e) => {
            tracing::error!(error = %e, "token signing failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_auth::StoreError;

    #[test]
    fn refresh_failures_share_one_response() {
        for err in [
            AuthError::InvalidRefreshToken,
            AuthError::AccessDenied,
            AuthError::RefreshTokenExpired,
        ] {
            assert_eq!(auth_error_to_response(err).status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn status_mapping() {
        assert_eq!(auth_error_to_response(AuthError::DuplicateEmail).status(), StatusCode::CONFLICT);
        assert_eq!(
            auth_error_to_response(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(auth_error_to_response(AuthError::Unauthenticated).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(auth_error_to_response(AuthError::Forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            auth_error_to_response(AuthError::Validation("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            auth_error_to_response(AuthError::Store(StoreError::Unavailable("down".into()))).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
