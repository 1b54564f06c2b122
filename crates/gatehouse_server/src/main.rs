use anyhow::Context;
use gatehouse_server::core::router::create_router;
use gatehouse_server::core::setup::setup_components;
use gatehouse_server::core::state::AppState;
use gatehouse_utils::color::LogColors;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, sql_client) = setup_components().await?;
    let port = config.server_port;

    let app_state = Arc::new(AppState::new(config, sql_client));

    // build our application with routes
    let app = create_router(app_state)
        .await
        .context(LogColors::purple("Failed to create router"))?;

    // run it
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| LogColors::purple(&format!("Failed to bind to port {}", port)))?;

    info!(
        "Listening on {}",
        LogColors::green(&listener.local_addr()?.to_string())
    );

    axum::serve(listener, app)
        .await
        .context(LogColors::purple("Server failed"))?;

    Ok(())
}
