use crate::core::error::{
    forbidden, internal_server_error, not_found, persistence_error, validation_error, ApiError,
    FieldErrors,
};
use crate::core::state::AppState;
use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::{http::StatusCode, routing::get, Extension, Json, Router};
use gatehouse_auth::permission::{authorize, Principal};
use gatehouse_error::error::SqlError;
use gatehouse_sql::base::SqlClient;
use gatehouse_sql::schemas::schema::{NewPermission, Permission, PermissionHistory};
use gatehouse_types::{Capability, PermissionRequest};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info};

/// Labels and codenames end up in `<app_label>.<codename>`, so neither may contain a dot
fn is_valid_label(value: &str) -> bool {
    !value.is_empty() && !value.contains('.') && !value.contains(char::is_whitespace)
}

fn validate_permission_request(request: &PermissionRequest) -> Result<NewPermission, ApiError> {
    let mut errors = FieldErrors::new();

    let name = request.name.trim();
    let app_label = request.app_label.trim();
    let codename = request.codename.trim();

    if name.is_empty() {
        errors.insert("name".to_string(), "This field is required.".to_string());
    }

    for (field, value) in [("app_label", app_label), ("codename", codename)] {
        if value.is_empty() {
            errors.insert(field.to_string(), "This field is required.".to_string());
        } else if !is_valid_label(value) {
            errors.insert(
                field.to_string(),
                "Must not contain dots or whitespace.".to_string(),
            );
        }
    }

    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    Ok(NewPermission {
        name: name.to_string(),
        app_label: app_label.to_string(),
        codename: codename.to_string(),
    })
}

/// Permissions backing a [`Capability`] may be renamed but keep their label and codename
fn check_builtin_unchanged(
    existing: &Permission,
    update: &NewPermission,
) -> Result<(), ApiError> {
    if Capability::find(&existing.app_label, &existing.codename).is_none() {
        return Ok(());
    }

    let mut errors = FieldErrors::new();
    if update.app_label != existing.app_label {
        errors.insert(
            "app_label".to_string(),
            "Built-in permissions cannot change their app label.".to_string(),
        );
    }
    if update.codename != existing.codename {
        errors.insert(
            "codename".to_string(),
            "Built-in permissions cannot change their codename.".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(validation_error(errors))
    }
}

fn save_error(e: SqlError) -> ApiError {
    match e {
        SqlError::UniqueViolation(_) => {
            let mut errors = FieldErrors::new();
            errors.insert(
                "codename".to_string(),
                "A permission with that codename already exists.".to_string(),
            );
            validation_error(errors)
        }
        _ => persistence_error(e),
    }
}

pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Permission>>, ApiError> {
    authorize(&principal, Capability::ViewPermission).map_err(forbidden)?;

    let permissions = state
        .sql_client
        .list_permissions()
        .await
        .map_err(internal_server_error)?;

    Ok(Json(permissions))
}

pub async fn create_permission(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<PermissionRequest>,
) -> Result<(StatusCode, Json<Permission>), ApiError> {
    authorize(&principal, Capability::AddPermission).map_err(forbidden)?;

    let new_permission = validate_permission_request(&request)?;

    let permission = state
        .sql_client
        .insert_permission(&new_permission, Some(principal.id()))
        .await
        .map_err(save_error)?;

    info!("Created permission {}", permission.identifier());

    Ok((StatusCode::CREATED, Json(permission)))
}

pub async fn get_permission(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Permission>, ApiError> {
    authorize(&principal, Capability::ViewPermission).map_err(forbidden)?;

    let permission = state
        .sql_client
        .get_permission(id)
        .await
        .map_err(internal_server_error)?
        .ok_or_else(not_found)?;

    Ok(Json(permission))
}

pub async fn update_permission(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(request): Json<PermissionRequest>,
) -> Result<Json<Permission>, ApiError> {
    authorize(&principal, Capability::ChangePermission).map_err(forbidden)?;

    let update = validate_permission_request(&request)?;

    let existing = state
        .sql_client
        .get_permission(id)
        .await
        .map_err(internal_server_error)?
        .ok_or_else(not_found)?;
    check_builtin_unchanged(&existing, &update)?;

    let permission = Permission {
        id,
        name: update.name,
        app_label: update.app_label,
        codename: update.codename,
    };

    state
        .sql_client
        .update_permission(&permission, Some(principal.id()))
        .await
        .map_err(save_error)?;

    Ok(Json(permission))
}

pub async fn get_permission_history(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PermissionHistory>>, ApiError> {
    authorize(&principal, Capability::ViewPermission).map_err(forbidden)?;

    state
        .sql_client
        .get_permission(id)
        .await
        .map_err(internal_server_error)?
        .ok_or_else(not_found)?;

    let history = state
        .sql_client
        .get_permission_history(id)
        .await
        .map_err(internal_server_error)?;

    Ok(Json(history))
}

pub async fn get_permission_router(prefix: &str) -> Result<Router<Arc<AppState>>> {
    let result = catch_unwind(AssertUnwindSafe(|| {
        Router::new()
            .route(
                &format!("{}/user/permission", prefix),
                get(list_permissions).post(create_permission),
            )
            .route(
                &format!("{}/user/permission/:id", prefix),
                get(get_permission).put(update_permission),
            )
            .route(
                &format!("{}/user/permission/:id/history", prefix),
                get(get_permission_history),
            )
    }));

    match result {
        Ok(router) => Ok(router),
        Err(_) => {
            error!("Failed to create permission router");
            Err(anyhow::anyhow!("Failed to create permission router"))
                .context("Panic occurred while creating the router")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_permission_request() {
        let request = PermissionRequest {
            name: "Can export reports".to_string(),
            app_label: "reports".to_string(),
            codename: " export_report ".to_string(),
        };
        let permission = validate_permission_request(&request).unwrap();
        assert_eq!(permission.codename, "export_report");

        let request = PermissionRequest {
            name: "".to_string(),
            app_label: "reports".to_string(),
            codename: "export.report".to_string(),
        };
        let (status, Json(body)) = validate_permission_request(&request).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"]["name"], "This field is required.");
        assert_eq!(
            body["detail"]["codename"],
            "Must not contain dots or whitespace."
        );
        assert!(body["detail"].get("app_label").is_none());
    }

    #[test]
    fn test_builtin_permission_keeps_codename() {
        let builtin = Permission {
            id: 1,
            name: "Can view user".to_string(),
            app_label: "user".to_string(),
            codename: "view_user".to_string(),
        };

        let renamed = NewPermission {
            name: "Can see users".to_string(),
            app_label: "user".to_string(),
            codename: "view_user".to_string(),
        };
        assert!(check_builtin_unchanged(&builtin, &renamed).is_ok());

        let moved = NewPermission {
            name: "Can view user".to_string(),
            app_label: "user".to_string(),
            codename: "see_user".to_string(),
        };
        let (status, Json(body)) = check_builtin_unchanged(&builtin, &moved).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["detail"]["codename"],
            "Built-in permissions cannot change their codename."
        );

        let custom = Permission {
            app_label: "reports".to_string(),
            codename: "export_report".to_string(),
            ..builtin
        };
        assert!(check_builtin_unchanged(&custom, &moved).is_ok());
    }
}
