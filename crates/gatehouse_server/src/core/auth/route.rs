use crate::core::auth::middleware::ACCESS_TOKEN_COOKIE;
use crate::core::auth::schema::UserTokenResponse;
use crate::core::error::{
    auth_error, internal_server_error, token_not_valid, validation_error, ApiError, FieldErrors,
};
use crate::core::state::AppState;
use crate::core::user::route::{create_account, read_form};
use anyhow::{Context, Result};
use axum::extract::{Multipart, State};
use axum::{http::StatusCode, routing::post, Extension, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use bytes::Bytes;
use gatehouse_auth::permission::Principal;
use gatehouse_sql::base::SqlClient;
use gatehouse_types::{
    AccessResponse, DetailResponse, LoginRequest, LogoutRequest, RefreshRequest, VerifyRequest,
};
use gatehouse_utils::utils::get_utc_datetime;
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info};

const FIELD_REQUIRED: &str = "This field is required.";

fn required_fields(fields: &[(&str, &str)]) -> Result<(), ApiError> {
    let errors: FieldErrors = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| (name.to_string(), FIELD_REQUIRED.to_string()))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(validation_error(errors))
    }
}

fn access_cookie(token: String) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .http_only(true)
        .path("/")
        .build()
}

/// Obtain a token pair for a username and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserTokenResponse>), ApiError> {
    required_fields(&[
        ("username", request.username.as_str()),
        ("password", request.password.as_str()),
    ])?;

    let mut user = state
        .auth_manager
        .authenticate(&state.sql_client, request.username.trim(), &request.password)
        .await
        .map_err(auth_error)?;

    user.last_login = Some(get_utc_datetime());
    state
        .sql_client
        .update_user(&user, Some(user.id))
        .await
        .map_err(internal_server_error)?;

    let tokens = state.auth_manager.issue(&user).map_err(auth_error)?;

    info!("User {} logged in", user.username);

    let jar = jar.add(access_cookie(tokens.access.clone()));
    Ok((jar, Json(UserTokenResponse::new(&user, tokens))))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AccessResponse>, ApiError> {
    required_fields(&[("refresh", request.refresh.as_str())])?;

    let access = state
        .auth_manager
        .refresh_access_token(&state.sql_client, &request.refresh)
        .await
        .map_err(auth_error)?;

    Ok(Json(AccessResponse { access }))
}

/// Accepts either token type. Revoked refresh tokens fail verification.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    required_fields(&[("token", request.token.as_str())])?;

    let claims = state
        .auth_manager
        .validate_token(&request.token)
        .map_err(|_| token_not_valid())?;

    let revoked = state
        .sql_client
        .is_token_revoked(&claims.jti)
        .await
        .map_err(internal_server_error)?;
    if revoked {
        return Err(token_not_valid());
    }

    Ok(Json(json!({})))
}

/// Self-service registration, only when enabled in the configuration
pub async fn signup(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UserTokenResponse>), ApiError> {
    if !state.config.allow_signup {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "detail": "Signup is disabled." })),
        ));
    }

    let form = read_form(multipart).await?;

    let user = create_account(&state, &form, None).await?;
    let tokens = state.auth_manager.issue(&user).map_err(auth_error)?;

    Ok((
        StatusCode::CREATED,
        Json(UserTokenResponse::new(&user, tokens)),
    ))
}

/// Access tokens are stateless and simply expire. A refresh token sent along with the
/// request is revoked when it belongs to the caller.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<DetailResponse>), ApiError> {
    let request: LogoutRequest = serde_json::from_slice(&body).unwrap_or_default();

    if let Some(refresh_token) = request.refresh {
        let revoked = state
            .auth_manager
            .revoke_refresh_token(&state.sql_client, &refresh_token, principal.id())
            .await
            .map_err(auth_error)?;

        if revoked {
            info!("Revoked refresh token for user {}", principal.id());
        }
    }

    let jar = jar.remove(Cookie::from(ACCESS_TOKEN_COOKIE));
    Ok((jar, Json(DetailResponse::new("User was logged out."))))
}

/// Token lifecycle routes that do not require authentication
pub async fn get_auth_router(prefix: &str) -> Result<Router<Arc<AppState>>> {
    let result = catch_unwind(AssertUnwindSafe(|| {
        Router::new()
            .route(&format!("{}/user/login", prefix), post(login))
            .route(&format!("{}/user/refresh", prefix), post(refresh))
            .route(&format!("{}/user/verify", prefix), post(verify))
            .route(&format!("{}/user/signup", prefix), post(signup))
    }));

    match result {
        Ok(router) => Ok(router),
        Err(_) => {
            error!("Failed to create auth router");
            Err(anyhow::anyhow!("Failed to create auth router"))
                .context("Panic occurred while creating the router")
        }
    }
}
