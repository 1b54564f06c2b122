use axum::{http::StatusCode, Json};
use gatehouse_error::error::{AuthError, SqlError};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::error;

pub type ApiError = (StatusCode, Json<Value>);

/// Field name -> message
pub type FieldErrors = BTreeMap<String, String>;

pub fn internal_server_error<T: Display>(e: T) -> ApiError {
    error!("Internal server error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Internal server error." })),
    )
}

pub fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." })))
}

pub fn bad_request(detail: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail })))
}

pub fn validation_error(errors: FieldErrors) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": errors })))
}

pub fn forbidden(e: AuthError) -> ApiError {
    (StatusCode::FORBIDDEN, Json(json!({ "detail": e.to_string() })))
}

pub fn not_authenticated() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Authentication credentials were not provided." })),
    )
}

pub fn token_not_valid() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "detail": "Token is invalid or expired",
            "code": "token_not_valid",
        })),
    )
}

pub fn auth_error(e: AuthError) -> ApiError {
    match e {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": e.to_string() })),
        ),
        AuthError::InvalidToken(_) => token_not_valid(),
        AuthError::Forbidden => forbidden(e),
        AuthError::TokenError(_) | AuthError::StoreError(_) => internal_server_error(e),
    }
}

/// Failures while writing. Missing rows stay a 404, everything else is reported as a
/// rejected save.
pub fn persistence_error(e: SqlError) -> ApiError {
    match e {
        SqlError::NotFound(_) => not_found(),
        _ => {
            error!("Failed to save record: {}", e);
            bad_request("Unable to save record.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_field_keyed() {
        let mut errors = FieldErrors::new();
        errors.insert("email".to_string(), "Email is required.".to_string());

        let (status, Json(body)) = validation_error(errors);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"]["email"], "Email is required.");
    }

    #[test]
    fn test_persistence_error() {
        let (status, _) = persistence_error(SqlError::NotFound("user 1".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, Json(body)) =
            persistence_error(SqlError::QueryError("disk full".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Unable to save record.");
    }

    #[test]
    fn test_auth_error() {
        let (status, Json(body)) = auth_error(AuthError::InvalidToken("expired".to_string()));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "token_not_valid");

        let (status, _) = auth_error(AuthError::Forbidden);
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
