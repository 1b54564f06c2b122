use gatehouse_sql::schemas::schema::User;
use gatehouse_types::TokenPair;
use serde::{Deserialize, Serialize};

/// Login/signup response: the token pair merged with the profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTokenResponse {
    pub refresh: String,
    pub access: String,
    pub id: i64,
    #[serde(rename = "_id")]
    pub legacy_id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub image: Option<String>,
    pub token: String,
}

impl UserTokenResponse {
    pub fn new(user: &User, tokens: TokenPair) -> Self {
        Self {
            token: tokens.access.clone(),
            refresh: tokens.refresh,
            access: tokens.access,
            id: user.id,
            legacy_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.display_name(),
            is_admin: user.is_staff,
            image: user.image.clone(),
        }
    }
}
