use crate::base::SqlClient;
use crate::postgres::client::PostgresClient;
use crate::schemas::schema::{
    Group, GroupHistory, NewPermission, NewUser, Permission, PermissionHistory, User,
    UserHistory,
};
use crate::sqlite::client::SqliteClient;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use gatehouse_error::error::SqlError;
use gatehouse_settings::config::{DatabaseSettings, SqlType};

#[derive(Debug, Clone)]
pub enum SqlClientEnum {
    Postgres(PostgresClient),
    Sqlite(SqliteClient),
}

macro_rules! dispatch {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            SqlClientEnum::Postgres(client) => client.$method($($arg),*).await,
            SqlClientEnum::Sqlite(client) => client.$method($($arg),*).await,
        }
    };
}

impl SqlClientEnum {
    pub fn name(&self) -> String {
        match self {
            SqlClientEnum::Postgres(_) => "postgres".to_string(),
            SqlClientEnum::Sqlite(_) => "sqlite".to_string(),
        }
    }
}

#[async_trait]
impl SqlClient for SqlClientEnum {
    async fn new(settings: &DatabaseSettings) -> Result<Self, SqlError> {
        match settings.sql_type {
            SqlType::Postgres => {
                let client = PostgresClient::new(settings).await?;
                Ok(SqlClientEnum::Postgres(client))
            }
            SqlType::Sqlite => {
                let client = SqliteClient::new(settings).await?;
                Ok(SqlClientEnum::Sqlite(client))
            }
        }
    }

    async fn run_migrations(&self) -> Result<(), SqlError> {
        dispatch!(self, run_migrations())
    }

    async fn insert_user(&self, user: &NewUser, actor: Option<i64>) -> Result<User, SqlError> {
        dispatch!(self, insert_user(user, actor))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, SqlError> {
        dispatch!(self, get_user(id))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, SqlError> {
        dispatch!(self, get_user_by_username(username))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, SqlError> {
        dispatch!(self, get_user_by_email(email))
    }

    async fn list_users(&self, include_superusers: bool) -> Result<Vec<User>, SqlError> {
        dispatch!(self, list_users(include_superusers))
    }

    async fn update_user(&self, user: &User, actor: Option<i64>) -> Result<(), SqlError> {
        dispatch!(self, update_user(user, actor))
    }

    async fn get_user_groups(&self, user_id: i64) -> Result<Vec<Group>, SqlError> {
        dispatch!(self, get_user_groups(user_id))
    }

    async fn get_user_permissions(&self, user_id: i64) -> Result<Vec<Permission>, SqlError> {
        dispatch!(self, get_user_permissions(user_id))
    }

    async fn set_user_groups(
        &self,
        user_id: i64,
        group_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<(), SqlError> {
        dispatch!(self, set_user_groups(user_id, group_ids, actor))
    }

    async fn set_user_permissions(
        &self,
        user_id: i64,
        permission_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<(), SqlError> {
        dispatch!(self, set_user_permissions(user_id, permission_ids, actor))
    }

    async fn get_user_history(&self, user_id: i64) -> Result<Vec<UserHistory>, SqlError> {
        dispatch!(self, get_user_history(user_id))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, SqlError> {
        dispatch!(self, list_groups())
    }

    async fn get_group(&self, id: i64) -> Result<Option<Group>, SqlError> {
        dispatch!(self, get_group(id))
    }

    async fn insert_group(
        &self,
        name: &str,
        permission_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<Group, SqlError> {
        dispatch!(self, insert_group(name, permission_ids, actor))
    }

    async fn update_group(
        &self,
        id: i64,
        name: &str,
        permission_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<(), SqlError> {
        dispatch!(self, update_group(id, name, permission_ids, actor))
    }

    async fn get_group_history(&self, group_id: i64) -> Result<Vec<GroupHistory>, SqlError> {
        dispatch!(self, get_group_history(group_id))
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, SqlError> {
        dispatch!(self, list_permissions())
    }

    async fn get_permission(&self, id: i64) -> Result<Option<Permission>, SqlError> {
        dispatch!(self, get_permission(id))
    }

    async fn insert_permission(
        &self,
        permission: &NewPermission,
        actor: Option<i64>,
    ) -> Result<Permission, SqlError> {
        dispatch!(self, insert_permission(permission, actor))
    }

    async fn update_permission(
        &self,
        permission: &Permission,
        actor: Option<i64>,
    ) -> Result<(), SqlError> {
        dispatch!(self, update_permission(permission, actor))
    }

    async fn get_permission_history(
        &self,
        permission_id: i64,
    ) -> Result<Vec<PermissionHistory>, SqlError> {
        dispatch!(self, get_permission_history(permission_id))
    }

    async fn revoke_token(
        &self,
        jti: &str,
        user_id: i64,
        expires_at: NaiveDateTime,
    ) -> Result<(), SqlError> {
        dispatch!(self, revoke_token(jti, user_id, expires_at))
    }

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, SqlError> {
        dispatch!(self, is_token_revoked(jti))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_enum_client() {
        let settings = DatabaseSettings {
            connection_uri: "sqlite::memory:".to_string(),
            max_connections: 1,
            sql_type: SqlType::Sqlite,
        };

        let client = SqlClientEnum::new(&settings).await.unwrap();
        assert_eq!(client.name(), "sqlite");
        assert!(client.list_users(true).await.unwrap().is_empty());
        assert_eq!(client.list_permissions().await.unwrap().len(), 9);
    }
}
