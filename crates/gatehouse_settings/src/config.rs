use gatehouse_error::error::SettingsError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::env;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum SqlType {
    Postgres,
    Sqlite,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Postgres => write!(f, "postgres"),
            SqlType::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl SqlType {
    /// Determine the backend from a connection uri. Anything that is not a postgres uri is
    /// handed to sqlite.
    pub fn from_uri(uri: &str) -> SqlType {
        let uri = uri.trim().to_lowercase();
        if uri.starts_with("postgres://") || uri.starts_with("postgresql://") {
            SqlType::Postgres
        } else {
            SqlType::Sqlite
        }
    }
}

impl FromStr for SqlType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed_lowercase = s.trim().trim_matches('"').to_lowercase();
        match trimmed_lowercase.as_str() {
            "postgres" | "postgresql" => Ok(SqlType::Postgres),
            "sqlite" => Ok(SqlType::Sqlite),
            _ => Err(SettingsError::Error(format!("Unsupported sql type: {}", s))),
        }
    }
}

/// Connection settings handed to the sql clients
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub connection_uri: String,
    pub max_connections: u32,
    pub sql_type: SqlType,
}

/// Credentials for the superuser created on first start
#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// GatehouseConfig is the primary configuration struct for the server.
/// Every value can be overridden through the environment.
#[derive(Debug, Clone)]
pub struct GatehouseConfig {
    pub app_name: String,
    pub app_env: String,
    pub app_version: String,
    pub gatehouse_tracking_uri: String,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub access_token_ttl: i64,
    pub refresh_token_ttl: i64,
    pub media_root: String,
    pub allow_signup: bool,
    pub server_port: u16,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_email: Option<String>,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for GatehouseConfig {
    fn default() -> Self {
        GatehouseConfig {
            app_name: "gatehouse".to_string(),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            gatehouse_tracking_uri: env::var("GATEHOUSE_TRACKING_URI")
                .unwrap_or_else(|_| "sqlite://gatehouse.db?mode=rwc".to_string()),
            max_connections: env_or("GATEHOUSE_MAX_CONNECTIONS", 5),

            jwt_secret: env::var("GATEHOUSE_JWT_SECRET").unwrap_or_else(|_| generate_jwt_secret()),
            access_token_ttl: env_or("GATEHOUSE_ACCESS_TTL_SECS", 300),
            refresh_token_ttl: env_or("GATEHOUSE_REFRESH_TTL_SECS", 86400),

            media_root: env::var("GATEHOUSE_MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string()),
            allow_signup: env_or("GATEHOUSE_ALLOW_SIGNUP", false),
            server_port: env_or("GATEHOUSE_SERVER_PORT", 3000),

            admin_username: env::var("GATEHOUSE_ADMIN_USERNAME").ok(),
            admin_password: env::var("GATEHOUSE_ADMIN_PASSWORD").ok(),
            admin_email: env::var("GATEHOUSE_ADMIN_EMAIL").ok(),
        }
    }
}

fn generate_jwt_secret() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect()
}

impl GatehouseConfig {
    pub fn new() -> Self {
        GatehouseConfig::default()
    }

    pub fn database_settings(&self) -> DatabaseSettings {
        DatabaseSettings {
            connection_uri: self.gatehouse_tracking_uri.clone(),
            max_connections: self.max_connections,
            sql_type: SqlType::from_uri(&self.gatehouse_tracking_uri),
        }
    }

    /// Admin bootstrap settings. Both a username and a password are needed, the email
    /// falls back to a local address.
    pub fn admin_settings(&self) -> Option<AdminSettings> {
        match (&self.admin_username, &self.admin_password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminSettings {
                    username: username.clone(),
                    password: password.clone(),
                    email: self
                        .admin_email
                        .clone()
                        .unwrap_or_else(|| format!("{}@localhost", username)),
                })
            }
            _ => None,
        }
    }
}
