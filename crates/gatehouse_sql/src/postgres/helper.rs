/// this file contains helper logic for generating postgres queries
use crate::base::SqlTableNames;
use crate::sqlite::helper::USER_COLUMNS;

pub struct PostgresQueryHelper;

impl PostgresQueryHelper {
    pub fn get_user_select_query(filter_column: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = $1",
            USER_COLUMNS,
            SqlTableNames::User,
            filter_column
        )
    }

    pub fn get_user_insert_query() -> String {
        format!(
            "INSERT INTO {} (
        username,
        email,
        password_hash,
        first_name,
        last_name,
        image,
        is_active,
        is_staff,
        is_superuser,
        date_joined
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id",
            SqlTableNames::User
        )
    }

    pub fn get_user_update_query() -> String {
        format!(
            "UPDATE {} SET
        username = $1,
        email = $2,
        password_hash = $3,
        first_name = $4,
        last_name = $5,
        image = $6,
        is_active = $7,
        is_staff = $8,
        is_superuser = $9,
        last_login = $10
        WHERE id = $11",
            SqlTableNames::User
        )
    }

    pub fn get_user_history_insert_query() -> String {
        format!(
            "INSERT INTO {} (
        user_id,
        username,
        email,
        first_name,
        last_name,
        image,
        is_active,
        is_staff,
        is_superuser,
        group_names,
        permission_names,
        history_type,
        history_date,
        history_user_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            SqlTableNames::UserHistory
        )
    }

    pub fn get_group_history_insert_query() -> String {
        format!(
            "INSERT INTO {} (group_id, name, permission_names, history_type, history_date, history_user_id) VALUES ($1, $2, $3, $4, $5, $6)",
            SqlTableNames::GroupHistory
        )
    }

    pub fn get_permission_history_insert_query() -> String {
        format!(
            "INSERT INTO {} (permission_id, name, app_label, codename, history_type, history_date, history_user_id) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            SqlTableNames::PermissionHistory
        )
    }

    pub fn get_user_group_names_query() -> String {
        format!(
            "SELECT g.name FROM {} g INNER JOIN {} ug ON ug.group_id = g.id WHERE ug.user_id = $1 ORDER BY g.name",
            SqlTableNames::Group,
            SqlTableNames::UserGroups
        )
    }

    pub fn get_user_permission_labels_query() -> String {
        format!(
            "SELECT p.app_label, p.codename FROM {} p INNER JOIN {} up ON up.permission_id = p.id WHERE up.user_id = $1 ORDER BY p.app_label, p.codename",
            SqlTableNames::Permission,
            SqlTableNames::UserPermissions
        )
    }

    pub fn get_group_permission_labels_query() -> String {
        format!(
            "SELECT p.app_label, p.codename FROM {} p INNER JOIN {} gp ON gp.permission_id = p.id WHERE gp.group_id = $1 ORDER BY p.app_label, p.codename",
            SqlTableNames::Permission,
            SqlTableNames::GroupPermissions
        )
    }

    pub fn get_group_permission_rows_query(filter: Option<&str>) -> String {
        let mut query = format!(
            "SELECT gp.group_id, p.id, p.name, p.app_label, p.codename FROM {} gp INNER JOIN {} p ON p.id = gp.permission_id",
            SqlTableNames::GroupPermissions,
            SqlTableNames::Permission
        );
        if let Some(filter) = filter {
            query.push_str(&format!(" WHERE {}", filter));
        }
        query.push_str(" ORDER BY p.app_label, p.codename");
        query
    }
}
