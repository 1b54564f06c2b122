use chrono::NaiveDateTime;
use gatehouse_sql::schemas::schema::{Group, Permission, User};
use serde::{Deserialize, Serialize};

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    #[serde(rename = "_id")]
    pub legacy_id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub is_active: bool,
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            legacy_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.display_name(),
            image: user.image.clone(),
            is_admin: user.is_staff,
            is_active: user.is_active,
            date_joined: user.date_joined,
            last_login: user.last_login,
        }
    }
}

/// Account view with names, groups and direct permissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetailResponse {
    pub id: i64,
    #[serde(rename = "_id")]
    pub legacy_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub is_active: bool,
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
    pub image: Option<String>,
    pub groups: Vec<Group>,
    pub permissions: Vec<Permission>,
}

impl UserDetailResponse {
    pub fn new(user: &User, groups: Vec<Group>, permissions: Vec<Permission>) -> Self {
        Self {
            id: user.id,
            legacy_id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            name: user.display_name(),
            is_admin: user.is_staff,
            is_active: user.is_active,
            date_joined: user.date_joined,
            last_login: user.last_login,
            image: user.image.clone(),
            groups,
            permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_utils::utils::get_utc_datetime;

    fn user() -> User {
        User {
            id: 3,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "".to_string(),
            last_name: "".to_string(),
            image: None,
            is_active: true,
            is_staff: true,
            is_superuser: false,
            date_joined: get_utc_datetime(),
            last_login: None,
        }
    }

    #[test]
    fn test_user_response_fields() {
        let value = serde_json::to_value(UserResponse::from(&user())).unwrap();
        assert_eq!(value["_id"], 3);
        assert_eq!(value["isAdmin"], true);
        assert_eq!(value["name"], "ada@example.com");
        assert!(value.get("password_hash").is_none());
        assert!(value.get("legacy_id").is_none());
    }
}
