use gatehouse_auth::auth::AuthManager;
use gatehouse_settings::config::GatehouseConfig;
use gatehouse_sql::enums::client::SqlClientEnum;
use std::sync::Arc;

pub struct AppState {
    pub sql_client: Arc<SqlClientEnum>,
    pub auth_manager: Arc<AuthManager>,
    pub config: Arc<GatehouseConfig>,
}

impl AppState {
    pub fn new(config: GatehouseConfig, sql_client: SqlClientEnum) -> Self {
        Self {
            auth_manager: Arc::new(AuthManager::from_config(&config)),
            sql_client: Arc::new(sql_client),
            config: Arc::new(config),
        }
    }
}
