use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    pub access: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignGroupsRequest {
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignPermissionsRequest {
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub app_label: String,
    #[serde(default)]
    pub codename: String,
}

/// Plain `{"detail": "..."}` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub fn new(detail: &str) -> Self {
        Self {
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_lists_default_to_empty() {
        let request: AssignGroupsRequest = serde_json::from_str("{}").unwrap();
        assert!(request.groups.is_empty());

        let request: AssignPermissionsRequest =
            serde_json::from_str(r#"{"permissions": ["view_user"]}"#).unwrap();
        assert_eq!(request.permissions, vec!["view_user".to_string()]);
    }

    #[test]
    fn test_logout_request_refresh_is_optional() {
        let request: LogoutRequest = serde_json::from_str("{}").unwrap();
        assert!(request.refresh.is_none());
    }
}
