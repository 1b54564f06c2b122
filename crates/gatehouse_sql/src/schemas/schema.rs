use chrono::NaiveDateTime;
use gatehouse_utils::utils::{display_name, get_utc_datetime};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

impl User {
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name, &self.email)
    }
}

/// User that has not been persisted yet
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: NaiveDateTime,
}

impl NewUser {
    /// Regular active account without staff or superuser rights
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        first_name: String,
        last_name: String,
    ) -> Self {
        NewUser {
            username,
            email,
            password_hash,
            first_name,
            last_name,
            image: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: get_utc_datetime(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub app_label: String,
    pub codename: String,
}

impl Permission {
    /// `<app_label>.<codename>`
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.app_label, self.codename)
    }
}

#[derive(Debug, Clone)]
pub struct NewPermission {
    pub name: String,
    pub app_label: String,
    pub codename: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupRecord {
    pub id: i64,
    pub name: String,
}

/// Row of a group/permission join
#[derive(Debug, Clone, FromRow)]
pub struct GroupPermissionRow {
    pub group_id: i64,
    pub id: i64,
    pub name: String,
    pub app_label: String,
    pub codename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl Group {
    /// Combine group rows with their permission rows, keeping the group order
    pub fn assemble(groups: Vec<GroupRecord>, rows: Vec<GroupPermissionRow>) -> Vec<Group> {
        let mut by_group: BTreeMap<i64, Vec<Permission>> = BTreeMap::new();
        for row in rows {
            by_group.entry(row.group_id).or_default().push(Permission {
                id: row.id,
                name: row.name,
                app_label: row.app_label,
                codename: row.codename,
            });
        }

        groups
            .into_iter()
            .map(|group| Group {
                permissions: by_group.remove(&group.id).unwrap_or_default(),
                id: group.id,
                name: group.name,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserHistory {
    pub history_id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub group_names: Json<Vec<String>>,
    pub permission_names: Json<Vec<String>>,
    pub history_type: String,
    pub history_date: NaiveDateTime,
    pub history_user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupHistory {
    pub history_id: i64,
    pub group_id: i64,
    pub name: String,
    pub permission_names: Json<Vec<String>>,
    pub history_type: String,
    pub history_date: NaiveDateTime,
    pub history_user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PermissionHistory {
    pub history_id: i64,
    pub permission_id: i64,
    pub name: String,
    pub app_label: String,
    pub codename: String,
    pub history_type: String,
    pub history_date: NaiveDateTime,
    pub history_user_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(group_id: i64, id: i64, codename: &str) -> GroupPermissionRow {
        GroupPermissionRow {
            group_id,
            id,
            name: codename.to_string(),
            app_label: "user".to_string(),
            codename: codename.to_string(),
        }
    }

    #[test]
    fn test_assemble_groups() {
        let groups = vec![
            GroupRecord {
                id: 2,
                name: "Editors".to_string(),
            },
            GroupRecord {
                id: 1,
                name: "Viewers".to_string(),
            },
        ];
        let rows = vec![row(1, 10, "view_user"), row(2, 11, "change_user"), row(2, 10, "view_user")];

        let assembled = Group::assemble(groups, rows);
        assert_eq!(assembled.len(), 2);
        assert_eq!(assembled[0].name, "Editors");
        assert_eq!(assembled[0].permissions.len(), 2);
        assert_eq!(assembled[1].permissions[0].identifier(), "user.view_user");
    }

    #[test]
    fn test_group_without_permissions() {
        let groups = vec![GroupRecord {
            id: 3,
            name: "Empty".to_string(),
        }];
        let assembled = Group::assemble(groups, vec![row(9, 10, "view_user")]);
        assert!(assembled[0].permissions.is_empty());
    }

    #[test]
    fn test_user_serialization_skips_password() {
        let user = User {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            first_name: "".to_string(),
            last_name: "".to_string(),
            image: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: get_utc_datetime(),
            last_login: None,
        };

        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(user.display_name(), "ada@example.com");
    }
}
