use crate::schemas::schema::{
    Group, GroupHistory, NewPermission, NewUser, Permission, PermissionHistory, User,
    UserHistory,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use gatehouse_error::error::SqlError;
use gatehouse_settings::config::DatabaseSettings;
use std::fmt;

pub enum SqlTableNames {
    User,
    Group,
    Permission,
    GroupPermissions,
    UserGroups,
    UserPermissions,
    UserHistory,
    GroupHistory,
    PermissionHistory,
    RevokedToken,
}

impl fmt::Display for SqlTableNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table_name = match self {
            SqlTableNames::User => "gatehouse_user",
            SqlTableNames::Group => "gatehouse_group",
            SqlTableNames::Permission => "gatehouse_permission",
            SqlTableNames::GroupPermissions => "gatehouse_group_permissions",
            SqlTableNames::UserGroups => "gatehouse_user_groups",
            SqlTableNames::UserPermissions => "gatehouse_user_permissions",
            SqlTableNames::UserHistory => "gatehouse_user_history",
            SqlTableNames::GroupHistory => "gatehouse_group_history",
            SqlTableNames::PermissionHistory => "gatehouse_permission_history",
            SqlTableNames::RevokedToken => "gatehouse_revoked_token",
        };
        write!(f, "{}", table_name)
    }
}

/// Map a driver error, keeping unique violations apart so callers can report them
pub fn map_sqlx_error(e: sqlx::Error) -> SqlError {
    if let Some(db_error) = e.as_database_error() {
        if db_error.is_unique_violation() {
            return SqlError::UniqueViolation(db_error.message().to_string());
        }
    }
    SqlError::QueryError(format!("{}", e))
}

/// Identity store and role/permission registry.
///
/// Every mutating call takes the id of the acting user (None for system actions) and
/// writes its history row in the same transaction as the change itself.
#[async_trait]
pub trait SqlClient {
    async fn new(settings: &DatabaseSettings) -> Result<Self, SqlError>
    where
        Self: Sized;
    async fn run_migrations(&self) -> Result<(), SqlError>;

    // users
    async fn insert_user(&self, user: &NewUser, actor: Option<i64>) -> Result<User, SqlError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, SqlError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, SqlError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, SqlError>;
    async fn list_users(&self, include_superusers: bool) -> Result<Vec<User>, SqlError>;
    async fn update_user(&self, user: &User, actor: Option<i64>) -> Result<(), SqlError>;
    async fn get_user_groups(&self, user_id: i64) -> Result<Vec<Group>, SqlError>;
    async fn get_user_permissions(&self, user_id: i64) -> Result<Vec<Permission>, SqlError>;
    async fn set_user_groups(
        &self,
        user_id: i64,
        group_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<(), SqlError>;
    async fn set_user_permissions(
        &self,
        user_id: i64,
        permission_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<(), SqlError>;
    async fn get_user_history(&self, user_id: i64) -> Result<Vec<UserHistory>, SqlError>;

    // groups
    async fn list_groups(&self) -> Result<Vec<Group>, SqlError>;
    async fn get_group(&self, id: i64) -> Result<Option<Group>, SqlError>;
    async fn insert_group(
        &self,
        name: &str,
        permission_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<Group, SqlError>;
    async fn update_group(
        &self,
        id: i64,
        name: &str,
        permission_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<(), SqlError>;
    async fn get_group_history(&self, group_id: i64) -> Result<Vec<GroupHistory>, SqlError>;

    // permissions
    async fn list_permissions(&self) -> Result<Vec<Permission>, SqlError>;
    async fn get_permission(&self, id: i64) -> Result<Option<Permission>, SqlError>;
    async fn insert_permission(
        &self,
        permission: &NewPermission,
        actor: Option<i64>,
    ) -> Result<Permission, SqlError>;
    async fn update_permission(
        &self,
        permission: &Permission,
        actor: Option<i64>,
    ) -> Result<(), SqlError>;
    async fn get_permission_history(
        &self,
        permission_id: i64,
    ) -> Result<Vec<PermissionHistory>, SqlError>;

    // revoked refresh tokens
    async fn revoke_token(
        &self,
        jti: &str,
        user_id: i64,
        expires_at: NaiveDateTime,
    ) -> Result<(), SqlError>;
    async fn is_token_revoked(&self, jti: &str) -> Result<bool, SqlError>;
}
