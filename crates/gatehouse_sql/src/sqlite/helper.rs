/// this file contains helper logic for generating sqlite queries
use crate::base::SqlTableNames;

pub const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, image, is_active, is_staff, is_superuser, date_joined, last_login";

pub struct SqliteQueryHelper;

impl SqliteQueryHelper {
    pub fn get_user_select_query(filter_column: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = ?",
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
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            SqlTableNames::User
        )
    }

    pub fn get_user_update_query() -> String {
        format!(
            "UPDATE {} SET
        username = ?,
        email = ?,
        password_hash = ?,
        first_name = ?,
        last_name = ?,
        image = ?,
        is_active = ?,
        is_staff = ?,
        is_superuser = ?,
        last_login = ?
        WHERE id = ?",
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
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            SqlTableNames::UserHistory
        )
    }

    pub fn get_group_history_insert_query() -> String {
        format!(
            "INSERT INTO {} (group_id, name, permission_names, history_type, history_date, history_user_id) VALUES (?, ?, ?, ?, ?, ?)",
            SqlTableNames::GroupHistory
        )
    }

    pub fn get_permission_history_insert_query() -> String {
        format!(
            "INSERT INTO {} (permission_id, name, app_label, codename, history_type, history_date, history_user_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
            SqlTableNames::PermissionHistory
        )
    }

    /// Group names of a user
    pub fn get_user_group_names_query() -> String {
        format!(
            "SELECT g.name FROM {} g INNER JOIN {} ug ON ug.group_id = g.id WHERE ug.user_id = ? ORDER BY g.name",
            SqlTableNames::Group,
            SqlTableNames::UserGroups
        )
    }

    /// (app_label, codename) of the direct permissions of a user
    pub fn get_user_permission_labels_query() -> String {
        format!(
            "SELECT p.app_label, p.codename FROM {} p INNER JOIN {} up ON up.permission_id = p.id WHERE up.user_id = ? ORDER BY p.app_label, p.codename",
            SqlTableNames::Permission,
            SqlTableNames::UserPermissions
        )
    }

    /// (app_label, codename) of the permissions of a group
    pub fn get_group_permission_labels_query() -> String {
        format!(
            "SELECT p.app_label, p.codename FROM {} p INNER JOIN {} gp ON gp.permission_id = p.id WHERE gp.group_id = ? ORDER BY p.app_label, p.codename",
            SqlTableNames::Permission,
            SqlTableNames::GroupPermissions
        )
    }

    /// Group/permission join rows, optionally narrowed by a where clause
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
