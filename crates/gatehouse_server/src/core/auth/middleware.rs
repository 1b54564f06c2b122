use crate::core::error::{internal_server_error, not_authenticated, token_not_valid, ApiError};
use crate::core::state::AppState;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{
    extract::{Request, State},
    middleware::Next,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use gatehouse_auth::permission::Principal;
use gatehouse_sql::base::SqlClient;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Resolve the caller from the access token and attach it to the request as a [`Principal`]
pub async fn auth_api_middleware(
    cookie_jar: CookieJar,
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let cookie_token = cookie_jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let header_token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| {
            auth_value
                .strip_prefix("Bearer ")
                .map(|token| token.trim().to_owned())
        });

    if cookie_token.is_none() && header_token.is_none() {
        return Err(not_authenticated());
    }

    // cookie first, a stale cookie falls through to the authorization header
    let claims = cookie_token
        .into_iter()
        .chain(header_token)
        .find_map(|token| match state.auth_manager.validate_access_token(&token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("Rejected access token: {}", e);
                None
            }
        })
        .ok_or_else(token_not_valid)?;

    let user = state
        .sql_client
        .get_user(claims.user_id)
        .await
        .map_err(internal_server_error)?
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "User not found", "code": "user_not_found" })),
            )
        })?;

    if !user.is_active {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "User is inactive", "code": "user_inactive" })),
        ));
    }

    let principal = Principal::load(&state.sql_client, user)
        .await
        .map_err(internal_server_error)?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
