use gatehouse_error::error::{AuthError, SqlError};
use gatehouse_sql::base::SqlClient;
use gatehouse_sql::enums::client::SqlClientEnum;
use gatehouse_sql::schemas::schema::{Group, Permission, User};
use gatehouse_types::Capability;
use std::collections::BTreeSet;

/// An authenticated user together with its effective permission identifiers
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub permissions: BTreeSet<String>,
}

impl Principal {
    pub fn new(user: User, direct: &[Permission], groups: &[Group]) -> Self {
        Self {
            user,
            permissions: effective_permissions(direct, groups),
        }
    }

    pub async fn load(sql_client: &SqlClientEnum, user: User) -> Result<Self, SqlError> {
        let direct = sql_client.get_user_permissions(user.id).await?;
        let groups = sql_client.get_user_groups(user.id).await?;
        Ok(Self::new(user, &direct, &groups))
    }

    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn is_superuser(&self) -> bool {
        self.user.is_superuser
    }
}

/// Direct permissions plus the permissions of every group
pub fn effective_permissions(direct: &[Permission], groups: &[Group]) -> BTreeSet<String> {
    direct
        .iter()
        .chain(groups.iter().flat_map(|group| group.permissions.iter()))
        .map(|permission| permission.identifier())
        .collect()
}

pub fn has_permission(principal: &Principal, identifier: &str) -> bool {
    principal.is_superuser() || principal.permissions.contains(identifier)
}

/// Allow or deny an action. Denials never say which permission was missing.
pub fn authorize(principal: &Principal, capability: Capability) -> Result<(), AuthError> {
    if has_permission(principal, &capability.identifier()) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Superuser accounts are invisible to everyone but superusers
pub fn can_view(principal: &Principal, target: &User) -> bool {
    principal.is_superuser() || !target.is_superuser
}
