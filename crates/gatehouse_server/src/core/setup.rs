use anyhow::{Context, Result as AnyhowResult};
use gatehouse_auth::auth::hash_password;
use gatehouse_error::error::SqlError;
use gatehouse_logging::logging::setup_logging;
use gatehouse_settings::config::GatehouseConfig;
use gatehouse_sql::base::SqlClient;
use gatehouse_sql::enums::client::SqlClientEnum;
use gatehouse_sql::schemas::schema::{NewUser, User};
use gatehouse_utils::color::LogColors;
use std::path::Path;
use tracing::info;

/// Create the configured superuser if it does not exist yet
pub async fn bootstrap_admin(
    config: &GatehouseConfig,
    sql_client: &SqlClientEnum,
) -> Result<Option<User>, SqlError> {
    let Some(admin) = config.admin_settings() else {
        return Ok(None);
    };

    if sql_client
        .get_user_by_username(&admin.username)
        .await?
        .is_some()
    {
        return Ok(None);
    }

    let mut new_user = NewUser::new(
        admin.username,
        admin.email,
        hash_password(&admin.password),
        String::new(),
        String::new(),
    );
    new_user.is_staff = true;
    new_user.is_superuser = true;

    let user = sql_client.insert_user(&new_user, None).await?;
    info!("Created superuser {}", LogColors::green(&user.username));

    Ok(Some(user))
}

pub async fn setup_components() -> AnyhowResult<(GatehouseConfig, SqlClientEnum)> {
    // setup config
    let config = GatehouseConfig::new();

    // start logging
    setup_logging()
        .await
        .context(LogColors::purple("Failed to setup logging"))?;

    info!(
        "Starting {} {} ({})",
        config.app_name, config.app_version, config.app_env
    );

    // setup sql
    let sql_client = SqlClientEnum::new(&config.database_settings())
        .await
        .context(LogColors::purple("Failed to setup sql client"))?;

    info!("Sql client: {}", sql_client.name());

    bootstrap_admin(&config, &sql_client)
        .await
        .context(LogColors::purple("Failed to create superuser"))?;

    tokio::fs::create_dir_all(Path::new(&config.media_root).join("images"))
        .await
        .context(LogColors::purple("Failed to create media directory"))?;

    Ok((config, sql_client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_settings::config::{DatabaseSettings, SqlType};

    #[tokio::test]
    async fn test_bootstrap_admin() {
        let settings = DatabaseSettings {
            connection_uri: "sqlite::memory:".to_string(),
            max_connections: 1,
            sql_type: SqlType::Sqlite,
        };
        let sql_client = SqlClientEnum::new(&settings).await.unwrap();

        let mut config = GatehouseConfig::new();
        config.admin_username = Some("root".to_string());
        config.admin_password = Some("s3cret".to_string());
        config.admin_email = None;

        let admin = bootstrap_admin(&config, &sql_client).await.unwrap().unwrap();
        assert!(admin.is_superuser);
        assert!(admin.is_staff);
        assert_eq!(admin.email, "root@localhost");

        // second start leaves the existing account alone
        assert!(bootstrap_admin(&config, &sql_client).await.unwrap().is_none());
    }
}
