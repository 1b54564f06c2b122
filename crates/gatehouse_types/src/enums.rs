use serde::{Deserialize, Serialize};
use std::fmt;

/// Actions the api guards. Each capability is backed by one permission row that is seeded
/// by the migrations, so grants are checked against a closed set rather than free-form
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    ViewUser,
    AddUser,
    ChangeUser,
    ViewGroup,
    AddGroup,
    ChangeGroup,
    ViewPermission,
    AddPermission,
    ChangePermission,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::ViewUser,
        Capability::AddUser,
        Capability::ChangeUser,
        Capability::ViewGroup,
        Capability::AddGroup,
        Capability::ChangeGroup,
        Capability::ViewPermission,
        Capability::AddPermission,
        Capability::ChangePermission,
    ];

    pub fn app_label(&self) -> &'static str {
        match self {
            Capability::ViewUser | Capability::AddUser | Capability::ChangeUser => "user",
            _ => "auth",
        }
    }

    pub fn codename(&self) -> &'static str {
        match self {
            Capability::ViewUser => "view_user",
            Capability::AddUser => "add_user",
            Capability::ChangeUser => "change_user",
            Capability::ViewGroup => "view_group",
            Capability::AddGroup => "add_group",
            Capability::ChangeGroup => "change_group",
            Capability::ViewPermission => "view_permission",
            Capability::AddPermission => "add_permission",
            Capability::ChangePermission => "change_permission",
        }
    }

    /// `<app_label>.<codename>`
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.app_label(), self.codename())
    }

    /// Built-in capability backed by the permission row with this label and codename
    pub fn find(app_label: &str, codename: &str) -> Option<Capability> {
        Capability::ALL
            .into_iter()
            .find(|c| c.app_label() == app_label && c.codename() == codename)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label(), self.codename())
    }
}

/// Marker stored with every history row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryType {
    Created,
    Changed,
}

impl HistoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryType::Created => "+",
            HistoryType::Changed => "~",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_capability_identifiers_are_unique() {
        let identifiers: HashSet<String> = Capability::ALL.iter().map(|c| c.identifier()).collect();
        assert_eq!(identifiers.len(), Capability::ALL.len());
    }

    #[test]
    fn test_capability_identifier() {
        assert_eq!(Capability::ViewUser.identifier(), "user.view_user");
        assert_eq!(Capability::ChangeGroup.identifier(), "auth.change_group");
        assert_eq!(Capability::AddPermission.to_string(), "auth.add_permission");
    }

    #[test]
    fn test_capability_find() {
        assert_eq!(
            Capability::find("user", "view_user"),
            Some(Capability::ViewUser)
        );
        assert_eq!(Capability::find("auth", "view_user"), None);
        assert_eq!(Capability::find("reports", "export_report"), None);
    }

    #[test]
    fn test_history_type() {
        assert_eq!(HistoryType::Created.as_str(), "+");
        assert_eq!(HistoryType::Changed.as_str(), "~");
    }
}
