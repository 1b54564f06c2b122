use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN_TYPE: &str = "access";
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Claims of a short lived access token. Carries enough of the profile for clients to
/// render the current account without another round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub token_type: String,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub token_type: String,
    pub user_id: i64,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Fields shared by both token types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseClaims {
    pub token_type: String,
    pub user_id: i64,
    pub exp: i64,
    pub jti: String,
}
