use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings Error: {0}")]
    Error(String),
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Logging Error: {0}")]
    Error(String),
}

#[derive(Error, Debug)]
pub enum UtilError {
    #[error("Util Error: {0}")]
    Error(String),

    #[error("Invalid boolean value: {0}")]
    BoolError(String),
}

#[derive(Error, Debug)]
pub enum SqlError {
    #[error("Failed to connect to the database: {0}")]
    ConnectionError(String),

    #[error("Failed to run migrations: {0}")]
    MigrationError(String),

    #[error("Failed to run query: {0}")]
    QueryError(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum AuthError {
    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error("Token is invalid or expired")]
    InvalidToken(String),

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("Failed to encode token: {0}")]
    TokenError(String),

    #[error("Failed to load account: {0}")]
    StoreError(String),
}

#[derive(Error, Debug, serde::Serialize)]
pub enum ServerError {
    #[error("Server failure: {0}")]
    Error(String),

    #[error("Failed to read multipart form: {0}")]
    MultipartError(String),

    #[error("Failed to store image: {0}")]
    ImageError(String),
}
