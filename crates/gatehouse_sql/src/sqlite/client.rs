use crate::base::{map_sqlx_error, SqlClient, SqlTableNames};
use crate::schemas::schema::{
    Group, GroupHistory, GroupPermissionRow, GroupRecord, NewPermission, NewUser, Permission,
    PermissionHistory, User, UserHistory,
};
use crate::sqlite::helper::{SqliteQueryHelper, USER_COLUMNS};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use gatehouse_error::error::SqlError;
use gatehouse_logging::logging::setup_logging;
use gatehouse_settings::config::DatabaseSettings;
use gatehouse_types::HistoryType;
use gatehouse_utils::utils::get_utc_datetime;
use sqlx::{sqlite::SqlitePoolOptions, types::Json, Pool, Sqlite, SqliteConnection};
use tracing::info;

#[derive(Debug, Clone)]
pub struct SqliteClient {
    pub pool: Pool<Sqlite>,
}

fn labels_to_identifiers(labels: Vec<(String, String)>) -> Vec<String> {
    labels
        .into_iter()
        .map(|(app_label, codename)| format!("{}.{}", app_label, codename))
        .collect()
}

async fn ensure_user_exists(conn: &mut SqliteConnection, user_id: i64) -> Result<(), SqlError> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE id = ?",
        SqlTableNames::User
    ))
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    if count == 0 {
        return Err(SqlError::NotFound(format!("user {}", user_id)));
    }
    Ok(())
}

/// Snapshot a user together with its current memberships
async fn write_user_history(
    conn: &mut SqliteConnection,
    user_id: i64,
    history_type: HistoryType,
    actor: Option<i64>,
) -> Result<(), SqlError> {
    let user: User = sqlx::query_as(&SqliteQueryHelper::get_user_select_query("id"))
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    let group_names: Vec<String> =
        sqlx::query_scalar(&SqliteQueryHelper::get_user_group_names_query())
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

    let labels: Vec<(String, String)> =
        sqlx::query_as(&SqliteQueryHelper::get_user_permission_labels_query())
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

    sqlx::query(&SqliteQueryHelper::get_user_history_insert_query())
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.image)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(Json(group_names))
        .bind(Json(labels_to_identifiers(labels)))
        .bind(history_type.as_str())
        .bind(get_utc_datetime())
        .bind(actor)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    Ok(())
}

async fn write_group_history(
    conn: &mut SqliteConnection,
    group_id: i64,
    history_type: HistoryType,
    actor: Option<i64>,
) -> Result<(), SqlError> {
    let group: GroupRecord = sqlx::query_as(&format!(
        "SELECT id, name FROM {} WHERE id = ?",
        SqlTableNames::Group
    ))
    .bind(group_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    let labels: Vec<(String, String)> =
        sqlx::query_as(&SqliteQueryHelper::get_group_permission_labels_query())
            .bind(group_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

    sqlx::query(&SqliteQueryHelper::get_group_history_insert_query())
        .bind(group.id)
        .bind(&group.name)
        .bind(Json(labels_to_identifiers(labels)))
        .bind(history_type.as_str())
        .bind(get_utc_datetime())
        .bind(actor)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    Ok(())
}

async fn write_permission_history(
    conn: &mut SqliteConnection,
    permission_id: i64,
    history_type: HistoryType,
    actor: Option<i64>,
) -> Result<(), SqlError> {
    let permission: Permission = sqlx::query_as(&format!(
        "SELECT id, name, app_label, codename FROM {} WHERE id = ?",
        SqlTableNames::Permission
    ))
    .bind(permission_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    sqlx::query(&SqliteQueryHelper::get_permission_history_insert_query())
        .bind(permission.id)
        .bind(&permission.name)
        .bind(&permission.app_label)
        .bind(&permission.codename)
        .bind(history_type.as_str())
        .bind(get_utc_datetime())
        .bind(actor)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    Ok(())
}

async fn replace_group_permissions(
    conn: &mut SqliteConnection,
    group_id: i64,
    permission_ids: &[i64],
) -> Result<(), SqlError> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE group_id = ?",
        SqlTableNames::GroupPermissions
    ))
    .bind(group_id)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    for permission_id in permission_ids {
        sqlx::query(&format!(
            "INSERT INTO {} (group_id, permission_id) VALUES (?, ?)",
            SqlTableNames::GroupPermissions
        ))
        .bind(group_id)
        .bind(permission_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    }

    Ok(())
}

impl SqliteClient {
    async fn get_user_by(&self, column: &str, value: &str) -> Result<Option<User>, SqlError> {
        sqlx::query_as(&SqliteQueryHelper::get_user_select_query(column))
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl SqlClient for SqliteClient {
    async fn new(settings: &DatabaseSettings) -> Result<Self, SqlError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.connection_uri)
            .await
            .map_err(|e| SqlError::ConnectionError(format!("{}", e)))?;

        // attempt to start logging, silently fail if it fails
        let _ = (setup_logging().await).is_ok();

        let client = Self { pool };

        client.run_migrations().await?;

        Ok(client)
    }

    async fn run_migrations(&self) -> Result<(), SqlError> {
        info!("Running migrations");
        sqlx::migrate!("src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SqlError::MigrationError(format!("{}", e)))?;

        Ok(())
    }

    async fn insert_user(&self, user: &NewUser, actor: Option<i64>) -> Result<User, SqlError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(&SqliteQueryHelper::get_user_insert_query())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.image)
            .bind(user.is_active)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.date_joined)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        write_user_history(&mut *tx, id, HistoryType::Created, actor).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        self.get_user(id)
            .await?
            .ok_or_else(|| SqlError::NotFound(format!("user {}", id)))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, SqlError> {
        sqlx::query_as(&SqliteQueryHelper::get_user_select_query("id"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, SqlError> {
        self.get_user_by("username", username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, SqlError> {
        self.get_user_by("email", email).await
    }

    /// List users ordered by id. Superusers are left out unless requested.
    async fn list_users(&self, include_superusers: bool) -> Result<Vec<User>, SqlError> {
        let mut query = format!("SELECT {} FROM {}", USER_COLUMNS, SqlTableNames::User);
        if !include_superusers {
            query.push_str(" WHERE is_superuser = ?");
        }
        query.push_str(" ORDER BY id");

        let mut builder = sqlx::query_as::<_, User>(&query);
        if !include_superusers {
            builder = builder.bind(false);
        }

        builder.fetch_all(&self.pool).await.map_err(map_sqlx_error)
    }

    async fn update_user(&self, user: &User, actor: Option<i64>) -> Result<(), SqlError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(&SqliteQueryHelper::get_user_update_query())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.image)
            .bind(user.is_active)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.last_login)
            .bind(user.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(SqlError::NotFound(format!("user {}", user.id)));
        }

        write_user_history(&mut *tx, user.id, HistoryType::Changed, actor).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_user_groups(&self, user_id: i64) -> Result<Vec<Group>, SqlError> {
        let groups: Vec<GroupRecord> = sqlx::query_as(&format!(
            "SELECT g.id, g.name FROM {} g INNER JOIN {} ug ON ug.group_id = g.id WHERE ug.user_id = ? ORDER BY g.name",
            SqlTableNames::Group,
            SqlTableNames::UserGroups
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let rows: Vec<GroupPermissionRow> =
            sqlx::query_as(&SqliteQueryHelper::get_group_permission_rows_query(Some(
                &format!(
                    "gp.group_id IN (SELECT group_id FROM {} WHERE user_id = ?)",
                    SqlTableNames::UserGroups
                ),
            )))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Group::assemble(groups, rows))
    }

    async fn get_user_permissions(&self, user_id: i64) -> Result<Vec<Permission>, SqlError> {
        sqlx::query_as(&format!(
            "SELECT p.id, p.name, p.app_label, p.codename FROM {} p INNER JOIN {} up ON up.permission_id = p.id WHERE up.user_id = ? ORDER BY p.app_label, p.codename",
            SqlTableNames::Permission,
            SqlTableNames::UserPermissions
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    /// Replace the group membership of a user
    async fn set_user_groups(
        &self,
        user_id: i64,
        group_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<(), SqlError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        ensure_user_exists(&mut *tx, user_id).await?;

        sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = ?",
            SqlTableNames::UserGroups
        ))
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for group_id in group_ids {
            sqlx::query(&format!(
                "INSERT INTO {} (user_id, group_id) VALUES (?, ?)",
                SqlTableNames::UserGroups
            ))
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        write_user_history(&mut *tx, user_id, HistoryType::Changed, actor).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    /// Replace the direct permissions of a user
    async fn set_user_permissions(
        &self,
        user_id: i64,
        permission_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<(), SqlError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        ensure_user_exists(&mut *tx, user_id).await?;

        sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = ?",
            SqlTableNames::UserPermissions
        ))
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for permission_id in permission_ids {
            sqlx::query(&format!(
                "INSERT INTO {} (user_id, permission_id) VALUES (?, ?)",
                SqlTableNames::UserPermissions
            ))
            .bind(user_id)
            .bind(permission_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        write_user_history(&mut *tx, user_id, HistoryType::Changed, actor).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_user_history(&self, user_id: i64) -> Result<Vec<UserHistory>, SqlError> {
        sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE user_id = ? ORDER BY history_id DESC",
            SqlTableNames::UserHistory
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, SqlError> {
        let groups: Vec<GroupRecord> = sqlx::query_as(&format!(
            "SELECT id, name FROM {} ORDER BY name",
            SqlTableNames::Group
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let rows: Vec<GroupPermissionRow> =
            sqlx::query_as(&SqliteQueryHelper::get_group_permission_rows_query(None))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(Group::assemble(groups, rows))
    }

    async fn get_group(&self, id: i64) -> Result<Option<Group>, SqlError> {
        let group: Option<GroupRecord> = sqlx::query_as(&format!(
            "SELECT id, name FROM {} WHERE id = ?",
            SqlTableNames::Group
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(group) = group else {
            return Ok(None);
        };

        let rows: Vec<GroupPermissionRow> = sqlx::query_as(
            &SqliteQueryHelper::get_group_permission_rows_query(Some("gp.group_id = ?")),
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(Group::assemble(vec![group], rows).pop())
    }

    async fn insert_group(
        &self,
        name: &str,
        permission_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<Group, SqlError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(&format!(
            "INSERT INTO {} (name) VALUES (?)",
            SqlTableNames::Group
        ))
        .bind(name)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        replace_group_permissions(&mut *tx, id, permission_ids).await?;
        write_group_history(&mut *tx, id, HistoryType::Created, actor).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        self.get_group(id)
            .await?
            .ok_or_else(|| SqlError::NotFound(format!("group {}", id)))
    }

    async fn update_group(
        &self,
        id: i64,
        name: &str,
        permission_ids: &[i64],
        actor: Option<i64>,
    ) -> Result<(), SqlError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET name = ? WHERE id = ?",
            SqlTableNames::Group
        ))
        .bind(name)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(SqlError::NotFound(format!("group {}", id)));
        }

        replace_group_permissions(&mut *tx, id, permission_ids).await?;
        write_group_history(&mut *tx, id, HistoryType::Changed, actor).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_group_history(&self, group_id: i64) -> Result<Vec<GroupHistory>, SqlError> {
        sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE group_id = ? ORDER BY history_id DESC",
            SqlTableNames::GroupHistory
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, SqlError> {
        sqlx::query_as(&format!(
            "SELECT id, name, app_label, codename FROM {} ORDER BY app_label, codename",
            SqlTableNames::Permission
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn get_permission(&self, id: i64) -> Result<Option<Permission>, SqlError> {
        sqlx::query_as(&format!(
            "SELECT id, name, app_label, codename FROM {} WHERE id = ?",
            SqlTableNames::Permission
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_permission(
        &self,
        permission: &NewPermission,
        actor: Option<i64>,
    ) -> Result<Permission, SqlError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(&format!(
            "INSERT INTO {} (name, app_label, codename) VALUES (?, ?, ?)",
            SqlTableNames::Permission
        ))
        .bind(&permission.name)
        .bind(&permission.app_label)
        .bind(&permission.codename)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        write_permission_history(&mut *tx, id, HistoryType::Created, actor).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        self.get_permission(id)
            .await?
            .ok_or_else(|| SqlError::NotFound(format!("permission {}", id)))
    }

    async fn update_permission(
        &self,
        permission: &Permission,
        actor: Option<i64>,
    ) -> Result<(), SqlError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET name = ?, app_label = ?, codename = ? WHERE id = ?",
            SqlTableNames::Permission
        ))
        .bind(&permission.name)
        .bind(&permission.app_label)
        .bind(&permission.codename)
        .bind(permission.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(SqlError::NotFound(format!("permission {}", permission.id)));
        }

        write_permission_history(&mut *tx, permission.id, HistoryType::Changed, actor).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_permission_history(
        &self,
        permission_id: i64,
    ) -> Result<Vec<PermissionHistory>, SqlError> {
        sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE permission_id = ? ORDER BY history_id DESC",
            SqlTableNames::PermissionHistory
        ))
        .bind(permission_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    /// Record a discarded refresh token. Entries that already expired are purged on the way.
    async fn revoke_token(
        &self,
        jti: &str,
        user_id: i64,
        expires_at: NaiveDateTime,
    ) -> Result<(), SqlError> {
        let now = get_utc_datetime();

        sqlx::query(&format!(
            "DELETE FROM {} WHERE expires_at < ?",
            SqlTableNames::RevokedToken
        ))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(&format!(
            "INSERT OR IGNORE INTO {} (jti, user_id, expires_at, revoked_at) VALUES (?, ?, ?, ?)",
            SqlTableNames::RevokedToken
        ))
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, SqlError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE jti = ?",
            SqlTableNames::RevokedToken
        ))
        .bind(jti)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use gatehouse_settings::config::SqlType;
    use gatehouse_types::Capability;

    async fn client() -> SqliteClient {
        let config = DatabaseSettings {
            connection_uri: "sqlite::memory:".to_string(),
            max_connections: 1,
            sql_type: SqlType::Sqlite,
        };

        SqliteClient::new(&config).await.unwrap()
    }

    fn new_user(username: &str) -> NewUser {
        NewUser::new(
            username.to_string(),
            format!("{}@example.com", username),
            "hash".to_string(),
            "First".to_string(),
            "Last".to_string(),
        )
    }

    async fn permission_id(client: &SqliteClient, codename: &str) -> i64 {
        client
            .list_permissions()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.codename == codename)
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_sqlite() {
        let _client = client().await;
    }

    #[tokio::test]
    async fn test_sqlite_seeded_permissions() {
        let client = client().await;
        let identifiers: Vec<String> = client
            .list_permissions()
            .await
            .unwrap()
            .iter()
            .map(|p| p.identifier())
            .collect();

        for capability in Capability::ALL {
            assert!(identifiers.contains(&capability.identifier()));
        }
    }

    #[tokio::test]
    async fn test_sqlite_insert_user() {
        let client = client().await;

        let user = client.insert_user(&new_user("ada"), None).await.unwrap();
        assert_eq!(user.username, "ada");
        assert!(user.is_active);
        assert!(user.last_login.is_none());

        let fetched = client.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "ada@example.com");
        assert_eq!(fetched.date_joined, user.date_joined);

        let by_name = client.get_user_by_username("ada").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        let by_email = client
            .get_user_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(client.get_user(999).await.unwrap().is_none());

        let history = client.get_user_history(user.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].history_type, "+");
        assert!(history[0].history_user_id.is_none());
    }

    #[tokio::test]
    async fn test_sqlite_duplicate_username() {
        let client = client().await;
        client.insert_user(&new_user("ada"), None).await.unwrap();

        let mut duplicate = new_user("ada");
        duplicate.email = "other@example.com".to_string();
        let result = client.insert_user(&duplicate, None).await;
        assert!(matches!(result, Err(SqlError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn test_sqlite_list_users_hides_superusers() {
        let client = client().await;
        client.insert_user(&new_user("ada"), None).await.unwrap();

        let mut root = new_user("root");
        root.is_superuser = true;
        client.insert_user(&root, None).await.unwrap();

        let visible = client.list_users(false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert!(visible.iter().all(|u| !u.is_superuser));

        let all = client.list_users(true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_update_user() {
        let client = client().await;
        let admin = client.insert_user(&new_user("admin"), None).await.unwrap();
        let mut user = client.insert_user(&new_user("ada"), None).await.unwrap();

        user.first_name = "Ada".to_string();
        user.last_login = Some(get_utc_datetime());
        client.update_user(&user, Some(admin.id)).await.unwrap();

        let fetched = client.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.first_name, "Ada");
        assert!(fetched.last_login.is_some());

        let history = client.get_user_history(user.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].history_type, "~");
        assert_eq!(history[0].first_name, "Ada");
        assert_eq!(history[0].history_user_id, Some(admin.id));

        user.id = 999;
        let result = client.update_user(&user, None).await;
        assert!(matches!(result, Err(SqlError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sqlite_assign_groups_and_permissions() {
        let client = client().await;
        let user = client.insert_user(&new_user("ada"), None).await.unwrap();

        let view_user = permission_id(&client, "view_user").await;
        let view_group = permission_id(&client, "view_group").await;

        let editors = client
            .insert_group("Editors", &[view_group], None)
            .await
            .unwrap();
        assert_eq!(editors.permissions.len(), 1);

        client
            .set_user_groups(user.id, &[editors.id], None)
            .await
            .unwrap();
        client
            .set_user_permissions(user.id, &[view_user], None)
            .await
            .unwrap();

        let groups = client.get_user_groups(user.id).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].permissions[0].identifier(), "auth.view_group");

        let permissions = client.get_user_permissions(user.id).await.unwrap();
        assert_eq!(permissions.len(), 1);
        assert_eq!(permissions[0].identifier(), "user.view_user");

        // membership changes are part of the snapshot
        let history = client.get_user_history(user.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].permission_names.0, vec!["user.view_user"]);
        assert_eq!(history[0].group_names.0, vec!["Editors"]);
        assert_eq!(history[1].group_names.0, vec!["Editors"]);
        assert!(history[1].permission_names.0.is_empty());

        // replace, not merge
        client.set_user_permissions(user.id, &[], None).await.unwrap();
        assert!(client.get_user_permissions(user.id).await.unwrap().is_empty());

        let result = client.set_user_groups(999, &[editors.id], None).await;
        assert!(matches!(result, Err(SqlError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sqlite_groups() {
        let client = client().await;
        let view_user = permission_id(&client, "view_user").await;
        let add_user = permission_id(&client, "add_user").await;

        let group = client.insert_group("Viewers", &[view_user], None).await.unwrap();
        client
            .update_group(group.id, "Operators", &[view_user, add_user], None)
            .await
            .unwrap();

        let fetched = client.get_group(group.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Operators");
        assert_eq!(fetched.permissions.len(), 2);

        assert_eq!(client.list_groups().await.unwrap().len(), 1);
        assert!(client.get_group(999).await.unwrap().is_none());

        let history = client.get_group_history(group.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].name, "Operators");
        assert_eq!(history[1].name, "Viewers");
        assert_eq!(history[1].permission_names.0, vec!["user.view_user"]);

        let duplicate = client.insert_group("Operators", &[], None).await;
        assert!(matches!(duplicate, Err(SqlError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn test_sqlite_permissions() {
        let client = client().await;
        let before = client.list_permissions().await.unwrap().len();

        let mut permission = client
            .insert_permission(
                &NewPermission {
                    name: "Can export reports".to_string(),
                    app_label: "reports".to_string(),
                    codename: "export_report".to_string(),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(client.list_permissions().await.unwrap().len(), before + 1);

        permission.name = "Can export every report".to_string();
        client.update_permission(&permission, None).await.unwrap();

        let fetched = client.get_permission(permission.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Can export every report");

        let history = client.get_permission_history(permission.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].history_type, "~");
    }

    #[tokio::test]
    async fn test_sqlite_revoked_tokens() {
        let client = client().await;
        let user = client.insert_user(&new_user("ada"), None).await.unwrap();
        let expires_at = get_utc_datetime() + chrono::Duration::hours(1);

        assert!(!client.is_token_revoked("abc").await.unwrap());
        client.revoke_token("abc", user.id, expires_at).await.unwrap();
        // revoking twice is a no-op
        client.revoke_token("abc", user.id, expires_at).await.unwrap();
        assert!(client.is_token_revoked("abc").await.unwrap());
    }
}
