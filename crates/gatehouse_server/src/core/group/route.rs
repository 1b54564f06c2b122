use crate::core::error::{
    forbidden, internal_server_error, not_found, persistence_error, validation_error, ApiError,
    FieldErrors,
};
use crate::core::state::AppState;
use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::{
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use gatehouse_auth::permission::{authorize, Principal};
use gatehouse_error::error::SqlError;
use gatehouse_sql::base::SqlClient;
use gatehouse_sql::registry::resolve_permissions;
use gatehouse_sql::schemas::schema::{Group, GroupHistory};
use gatehouse_types::{Capability, GroupRequest};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info};

/// Check the request and resolve its permission codenames
async fn validate_group_request(
    state: &AppState,
    request: &GroupRequest,
) -> Result<Vec<i64>, ApiError> {
    let mut errors = FieldErrors::new();

    if request.name.trim().is_empty() {
        errors.insert("name".to_string(), "This field is required.".to_string());
    }

    let catalog = state
        .sql_client
        .list_permissions()
        .await
        .map_err(internal_server_error)?;

    let permission_ids = match resolve_permissions(&catalog, &request.permissions) {
        Ok(ids) => ids,
        Err(unknown) => {
            errors.insert(
                "permissions".to_string(),
                format!("Permission(s) not found: {}", unknown.join(", ")),
            );
            vec![]
        }
    };

    if errors.is_empty() {
        Ok(permission_ids)
    } else {
        Err(validation_error(errors))
    }
}

fn save_error(e: SqlError) -> ApiError {
    match e {
        SqlError::UniqueViolation(_) => {
            let mut errors = FieldErrors::new();
            errors.insert(
                "name".to_string(),
                "A group with that name already exists.".to_string(),
            );
            validation_error(errors)
        }
        _ => persistence_error(e),
    }
}

pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Group>>, ApiError> {
    authorize(&principal, Capability::ViewGroup).map_err(forbidden)?;

    let groups = state
        .sql_client
        .list_groups()
        .await
        .map_err(internal_server_error)?;

    Ok(Json(groups))
}

pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<GroupRequest>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    authorize(&principal, Capability::AddGroup).map_err(forbidden)?;

    let permission_ids = validate_group_request(&state, &request).await?;

    let group = state
        .sql_client
        .insert_group(request.name.trim(), &permission_ids, Some(principal.id()))
        .await
        .map_err(save_error)?;

    info!("Created group {}", group.name);

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Group>, ApiError> {
    authorize(&principal, Capability::ViewGroup).map_err(forbidden)?;

    let group = state
        .sql_client
        .get_group(id)
        .await
        .map_err(internal_server_error)?
        .ok_or_else(not_found)?;

    Ok(Json(group))
}

/// Rename a group and replace its permissions
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(request): Json<GroupRequest>,
) -> Result<Json<Group>, ApiError> {
    authorize(&principal, Capability::ChangeGroup).map_err(forbidden)?;

    let permission_ids = validate_group_request(&state, &request).await?;

    state
        .sql_client
        .update_group(id, request.name.trim(), &permission_ids, Some(principal.id()))
        .await
        .map_err(save_error)?;

    let group = state
        .sql_client
        .get_group(id)
        .await
        .map_err(internal_server_error)?
        .ok_or_else(not_found)?;

    Ok(Json(group))
}

pub async fn get_group_history(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<GroupHistory>>, ApiError> {
    authorize(&principal, Capability::ViewGroup).map_err(forbidden)?;

    state
        .sql_client
        .get_group(id)
        .await
        .map_err(internal_server_error)?
        .ok_or_else(not_found)?;

    let history = state
        .sql_client
        .get_group_history(id)
        .await
        .map_err(internal_server_error)?;

    Ok(Json(history))
}

pub async fn get_group_router(prefix: &str) -> Result<Router<Arc<AppState>>> {
    let result = catch_unwind(AssertUnwindSafe(|| {
        Router::new()
            .route(
                &format!("{}/user/group", prefix),
                get(list_groups).post(create_group),
            )
            .route(
                &format!("{}/user/group/:id", prefix),
                get(get_group).put(update_group),
            )
            .route(
                &format!("{}/user/group/:id/history", prefix),
                get(get_group_history),
            )
    }));

    match result {
        Ok(router) => Ok(router),
        Err(_) => {
            error!("Failed to create group router");
            Err(anyhow::anyhow!("Failed to create group router"))
                .context("Panic occurred while creating the router")
        }
    }
}
