//! Name resolution against the role/permission registry.
//!
//! Assignments are validated as a whole: either every requested name resolves and the ids
//! are returned, or the unresolved names are returned and nothing should be written.

use crate::schemas::schema::{Group, Permission};

/// Resolve permission codenames. A name may be a bare codename (`view_user`) or a full
/// identifier (`user.view_user`).
///
/// # Returns
///
/// * `Ok(Vec<i64>)` - ids in request order without duplicates
/// * `Err(Vec<String>)` - every name that did not resolve
pub fn resolve_permissions(
    catalog: &[Permission],
    requested: &[String],
) -> Result<Vec<i64>, Vec<String>> {
    let mut ids = Vec::with_capacity(requested.len());
    let mut unknown = Vec::new();

    for name in requested {
        let name = name.trim();
        let found = catalog.iter().find(|permission| match name.split_once('.') {
            Some((app_label, codename)) => {
                permission.app_label == app_label && permission.codename == codename
            }
            None => permission.codename == name,
        });

        match found {
            Some(permission) if !ids.contains(&permission.id) => ids.push(permission.id),
            Some(_) => {}
            None => unknown.push(name.to_string()),
        }
    }

    if unknown.is_empty() {
        Ok(ids)
    } else {
        Err(unknown)
    }
}

/// Resolve group names, same contract as [`resolve_permissions`]
pub fn resolve_groups(catalog: &[Group], requested: &[String]) -> Result<Vec<i64>, Vec<String>> {
    let mut ids = Vec::with_capacity(requested.len());
    let mut unknown = Vec::new();

    for name in requested {
        let name = name.trim();
        match catalog.iter().find(|group| group.name == name) {
            Some(group) if !ids.contains(&group.id) => ids.push(group.id),
            Some(_) => {}
            None => unknown.push(name.to_string()),
        }
    }

    if unknown.is_empty() {
        Ok(ids)
    } else {
        Err(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissions() -> Vec<Permission> {
        vec![
            Permission {
                id: 1,
                name: "Can view user".to_string(),
                app_label: "user".to_string(),
                codename: "view_user".to_string(),
            },
            Permission {
                id: 2,
                name: "Can view group".to_string(),
                app_label: "auth".to_string(),
                codename: "view_group".to_string(),
            },
        ]
    }

    fn groups() -> Vec<Group> {
        vec![
            Group {
                id: 5,
                name: "Editors".to_string(),
                permissions: vec![],
            },
            Group {
                id: 6,
                name: "Viewers".to_string(),
                permissions: vec![],
            },
        ]
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_resolve_permissions_bare_and_qualified() {
        let ids = resolve_permissions(&permissions(), &names(&["view_user", "auth.view_group"]))
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_resolve_permissions_wrong_app_label() {
        let unknown =
            resolve_permissions(&permissions(), &names(&["auth.view_user"])).unwrap_err();
        assert_eq!(unknown, names(&["auth.view_user"]));
    }

    #[test]
    fn test_resolve_permissions_reports_every_unknown() {
        let unknown = resolve_permissions(
            &permissions(),
            &names(&["view_x", "view_user", "delete_everything"]),
        )
        .unwrap_err();
        assert_eq!(unknown, names(&["view_x", "delete_everything"]));
    }

    #[test]
    fn test_resolve_permissions_deduplicates() {
        let ids = resolve_permissions(&permissions(), &names(&["view_user", "user.view_user"]))
            .unwrap();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_resolve_groups() {
        assert_eq!(
            resolve_groups(&groups(), &names(&["Viewers", "Editors"])).unwrap(),
            vec![6, 5]
        );

        let unknown = resolve_groups(&groups(), &names(&["Editors", "Ghost"])).unwrap_err();
        assert_eq!(unknown, names(&["Ghost"]));
    }
}
