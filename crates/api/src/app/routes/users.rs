use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};

use gatehouse_auth::{AccountQuery, AccountStore, AuthError, Page, RoleSet, SortOrder};
use gatehouse_core::AccountId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz::{authorize, authorize_self_or};
use crate::context::PrincipalContext;

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListUsersQuery>,
) -> axum::response::Response {
    if let Err(denied) = authorize(&principal, RoleSet::ADMIN_ONLY) {
        return denied;
    }

    let order = match query.order.as_deref().map(str::parse::<SortOrder>).transpose() {
        Ok(order) => order.unwrap_or_default(),
        Err(e) => return errors::auth_error_to_response(AuthError::from(e)),
    };
    let query = AccountQuery::new(Page::new(query.skip, query.take), query.search, order);

    match services.sessions.accounts().list(&query).await {
        Ok(result) => {
            let items: Vec<_> = result.items.iter().map(|a| a.profile()).collect();
            Json(dto::UsersPage {
                count: items.len(),
                items,
                total: result.total,
                skip: query.page.skip,
                take: query.page.take,
            })
            .into_response()
        }
        Err(e) => errors::auth_error_to_response(e.into()),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("{e}")),
    };
    if let Err(denied) = authorize_self_or(&principal, id, RoleSet::ADMIN_ONLY) {
        return denied;
    }

    match services.sessions.accounts().find_by_id(id).await {
        Ok(Some(account)) => Json(account.profile()).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "account not found"),
        Err(e) => errors::auth_error_to_response(e.into()),
    }
}
