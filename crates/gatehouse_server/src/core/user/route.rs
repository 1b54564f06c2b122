use crate::core::auth::route::logout;
use crate::core::error::{
    bad_request, forbidden, internal_server_error, not_found, persistence_error, validation_error,
    ApiError, FieldErrors,
};
use crate::core::state::AppState;
use crate::core::user::form::UserForm;
use crate::core::user::image::{discard_image, store_image};
use crate::core::user::schema::{UserDetailResponse, UserResponse};
use crate::core::user::validate::{
    validate_create_user_form, validate_update_user_form, ValidatedForm,
};
use anyhow::{Context, Result};
use axum::extract::{Multipart, Path, State};
use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use gatehouse_auth::auth::hash_password;
use gatehouse_auth::permission::{authorize, can_view, Principal};
use gatehouse_error::error::{AuthError, SqlError};
use gatehouse_sql::base::SqlClient;
use gatehouse_sql::registry::{resolve_groups, resolve_permissions};
use gatehouse_sql::schemas::schema::{NewUser, User, UserHistory};
use gatehouse_types::{AssignGroupsRequest, AssignPermissionsRequest, Capability};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info};

/// Fetch a user the caller is allowed to see. Hidden accounts look exactly like absent ones.
async fn visible_user(state: &AppState, principal: &Principal, id: i64) -> Result<User, ApiError> {
    let user = state
        .sql_client
        .get_user(id)
        .await
        .map_err(internal_server_error)?
        .ok_or_else(not_found)?;

    if !can_view(principal, &user) {
        return Err(not_found());
    }

    Ok(user)
}

async fn user_detail(state: &AppState, user: &User) -> Result<UserDetailResponse, ApiError> {
    let groups = state
        .sql_client
        .get_user_groups(user.id)
        .await
        .map_err(internal_server_error)?;
    let permissions = state
        .sql_client
        .get_user_permissions(user.id)
        .await
        .map_err(internal_server_error)?;

    Ok(UserDetailResponse::new(user, groups, permissions))
}

/// Record an error for every username/email already held by another account
async fn check_unique(
    state: &AppState,
    username: Option<&str>,
    email: Option<&str>,
    current_id: Option<i64>,
    errors: &mut FieldErrors,
) -> Result<(), ApiError> {
    if let Some(username) = username {
        let existing = state
            .sql_client
            .get_user_by_username(username)
            .await
            .map_err(internal_server_error)?;
        if existing.is_some_and(|user| Some(user.id) != current_id) {
            errors.insert(
                "username".to_string(),
                "A user with that username already exists.".to_string(),
            );
        }
    }

    if let Some(email) = email {
        let existing = state
            .sql_client
            .get_user_by_email(email)
            .await
            .map_err(internal_server_error)?;
        if existing.is_some_and(|user| Some(user.id) != current_id) {
            errors.insert(
                "email".to_string(),
                "A user with that email already exists.".to_string(),
            );
        }
    }

    Ok(())
}

async fn save_image(
    state: &AppState,
    form: &UserForm,
    validated: &ValidatedForm,
) -> Result<Option<String>, ApiError> {
    match (&form.image, validated.image_format) {
        (Some(data), Some(format)) => store_image(&state.config.media_root, data, format)
            .await
            .map(Some)
            .map_err(internal_server_error),
        _ => Ok(None),
    }
}

/// Report a failed save, removing an image stored for the record that was not written
async fn save_failed(state: &AppState, stored_image: Option<&str>, e: SqlError) -> ApiError {
    if let Some(image) = stored_image {
        discard_image(&state.config.media_root, image).await;
    }
    persistence_error(e)
}

pub async fn read_form(multipart: Multipart) -> Result<UserForm, ApiError> {
    UserForm::from_multipart(multipart).await.map_err(|e| {
        error!("Failed to read form: {}", e);
        bad_request(&e.to_string())
    })
}

/// Validate and persist a new account.
///
/// `actor` is the admin creating the account, or None for self-signup. Flags are only
/// honoured for admins and only superusers may create superusers.
pub async fn create_account(
    state: &AppState,
    form: &UserForm,
    actor: Option<&Principal>,
) -> Result<User, ApiError> {
    let validated = validate_create_user_form(form).map_err(validation_error)?;

    let mut errors = FieldErrors::new();
    check_unique(
        state,
        form.get("username"),
        form.get("email"),
        None,
        &mut errors,
    )
    .await?;
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    // required fields are present once validation passed
    let field = |name: &str| form.get(name).unwrap_or_default().to_string();
    let password = form.get_raw("password").unwrap_or_default();

    let mut new_user = NewUser::new(
        field("username"),
        field("email"),
        hash_password(password),
        field("first_name"),
        field("last_name"),
    );

    if let Some(actor) = actor {
        if validated.is_superuser == Some(true) && !actor.is_superuser() {
            return Err(forbidden(AuthError::Forbidden));
        }
        new_user.is_active = validated.is_active.unwrap_or(true);
        new_user.is_staff = validated.is_staff.unwrap_or(false);
        new_user.is_superuser = validated.is_superuser.unwrap_or(false);
    }

    new_user.image = save_image(state, form, &validated).await?;

    let user = match state
        .sql_client
        .insert_user(&new_user, actor.map(|a| a.id()))
        .await
    {
        Ok(user) => user,
        Err(e) => return Err(save_failed(state, new_user.image.as_deref(), e).await),
    };

    info!("Created user {} ({})", user.username, user.id);

    Ok(user)
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    authorize(&principal, Capability::ViewUser).map_err(forbidden)?;

    let users = state
        .sql_client
        .list_users(principal.is_superuser())
        .await
        .map_err(internal_server_error)?;

    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UserDetailResponse>), ApiError> {
    authorize(&principal, Capability::AddUser).map_err(forbidden)?;

    let form = read_form(multipart).await?;
    let user = create_account(&state, &form, Some(&principal)).await?;

    Ok((StatusCode::CREATED, Json(user_detail(&state, &user).await?)))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    authorize(&principal, Capability::ViewUser).map_err(forbidden)?;

    let user = visible_user(&state, &principal, id).await?;
    Ok(Json(user_detail(&state, &user).await?))
}

/// Admin update. Only the fields present in the form are changed.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<UserDetailResponse>, ApiError> {
    authorize(&principal, Capability::ChangeUser).map_err(forbidden)?;

    let mut user = visible_user(&state, &principal, id).await?;
    let form = read_form(multipart).await?;
    let validated = validate_update_user_form(&form).map_err(validation_error)?;

    // resending the current value is not a privilege change
    let changes_superuser = validated
        .is_superuser
        .is_some_and(|flag| flag != user.is_superuser);
    if changes_superuser && !principal.is_superuser() {
        return Err(forbidden(AuthError::Forbidden));
    }

    let mut errors = FieldErrors::new();
    check_unique(
        &state,
        form.get("username"),
        form.get("email"),
        Some(user.id),
        &mut errors,
    )
    .await?;
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    user.first_name = form.get("first_name").unwrap_or_default().to_string();
    user.last_name = form.get("last_name").unwrap_or_default().to_string();

    if let Some(username) = form.get("username") {
        user.username = username.to_string();
    }
    if let Some(email) = form.get("email") {
        user.email = email.to_string();
    }
    if let Some(password) = form.get_raw("password") {
        user.password_hash = hash_password(password);
    }
    if let Some(is_active) = validated.is_active {
        user.is_active = is_active;
    }
    if let Some(is_staff) = validated.is_staff {
        user.is_staff = is_staff;
    }
    if let Some(is_superuser) = validated.is_superuser {
        user.is_superuser = is_superuser;
    }
    let stored_image = save_image(&state, &form, &validated).await?;
    if let Some(image) = &stored_image {
        user.image = Some(image.clone());
    }

    if let Err(e) = state
        .sql_client
        .update_user(&user, Some(principal.id()))
        .await
    {
        return Err(save_failed(&state, stored_image.as_deref(), e).await);
    }

    Ok(Json(user_detail(&state, &user).await?))
}

pub async fn get_user_history(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<UserHistory>>, ApiError> {
    authorize(&principal, Capability::ViewUser).map_err(forbidden)?;

    let user = visible_user(&state, &principal, id).await?;
    let history = state
        .sql_client
        .get_user_history(user.id)
        .await
        .map_err(internal_server_error)?;

    Ok(Json(history))
}

/// Replace the group membership of a user. Every name must resolve or nothing changes.
pub async fn assign_groups(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(request): Json<AssignGroupsRequest>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    authorize(&principal, Capability::ChangeUser).map_err(forbidden)?;

    let user = visible_user(&state, &principal, id).await?;

    if request.groups.is_empty() {
        return Err(bad_request("Groups list cannot be empty."));
    }

    let catalog = state
        .sql_client
        .list_groups()
        .await
        .map_err(internal_server_error)?;

    let group_ids = resolve_groups(&catalog, &request.groups).map_err(|unknown| {
        let mut errors = FieldErrors::new();
        errors.insert(
            "groups".to_string(),
            format!("Group(s) not found: {}", unknown.join(", ")),
        );
        validation_error(errors)
    })?;

    state
        .sql_client
        .set_user_groups(user.id, &group_ids, Some(principal.id()))
        .await
        .map_err(persistence_error)?;

    Ok(Json(user_detail(&state, &user).await?))
}

/// Replace the direct permissions of a user. Every codename must resolve or nothing changes.
pub async fn assign_permissions(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(request): Json<AssignPermissionsRequest>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    authorize(&principal, Capability::ChangeUser).map_err(forbidden)?;

    let user = visible_user(&state, &principal, id).await?;

    if request.permissions.is_empty() {
        return Err(bad_request("Permissions list cannot be empty."));
    }

    let catalog = state
        .sql_client
        .list_permissions()
        .await
        .map_err(internal_server_error)?;

    let permission_ids = resolve_permissions(&catalog, &request.permissions).map_err(|unknown| {
        let mut errors = FieldErrors::new();
        errors.insert(
            "permissions".to_string(),
            format!("Permission(s) not found: {}", unknown.join(", ")),
        );
        validation_error(errors)
    })?;

    state
        .sql_client
        .set_user_permissions(user.id, &permission_ids, Some(principal.id()))
        .await
        .map_err(persistence_error)?;

    Ok(Json(user_detail(&state, &user).await?))
}

/// Profile of the caller
pub async fn session(Extension(principal): Extension<Principal>) -> Json<UserResponse> {
    Json(UserResponse::from(&principal.user))
}

/// Self-service update of names and profile image
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let form = read_form(multipart).await?;
    let validated = validate_update_user_form(&form).map_err(validation_error)?;

    let mut user = principal.user.clone();
    user.first_name = form.get("first_name").unwrap_or_default().to_string();
    user.last_name = form.get("last_name").unwrap_or_default().to_string();

    let stored_image = save_image(&state, &form, &validated).await?;
    if let Some(image) = &stored_image {
        user.image = Some(image.clone());
    }

    if let Err(e) = state
        .sql_client
        .update_user(&user, Some(principal.id()))
        .await
    {
        return Err(save_failed(&state, stored_image.as_deref(), e).await);
    }

    Ok(Json(user_detail(&state, &user).await?))
}

/// Account routes that require an authenticated caller
pub async fn get_user_router(prefix: &str) -> Result<Router<Arc<AppState>>> {
    let result = catch_unwind(AssertUnwindSafe(|| {
        Router::new()
            .route(&format!("{}/user", prefix), get(list_users).post(create_user))
            .route(&format!("{}/user/logout", prefix), post(logout))
            .route(
                &format!("{}/user/session", prefix),
                post(session).put(update_session),
            )
            .route(
                &format!("{}/user/:id", prefix),
                get(get_user).post(update_user),
            )
            .route(
                &format!("{}/user/:id/history", prefix),
                get(get_user_history),
            )
            .route(&format!("{}/user/:id/groups", prefix), put(assign_groups))
            .route(
                &format!("{}/user/:id/permissions", prefix),
                put(assign_permissions),
            )
    }));

    match result {
        Ok(router) => Ok(router),
        Err(_) => {
            error!("Failed to create user router");
            Err(anyhow::anyhow!("Failed to create user router"))
                .context("Panic occurred while creating the router")
        }
    }
}
