use crate::core::auth::middleware::auth_api_middleware;
use crate::core::auth::route::get_auth_router;
use crate::core::group::route::get_group_router;
use crate::core::health::route::health_check;
use crate::core::permission::route::get_permission_router;
use crate::core::state::AppState;
use crate::core::user::route::get_user_router;
use anyhow::Result;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub const ROUTE_PREFIX: &str = "/gatehouse";

pub async fn create_router(app_state: Arc<AppState>) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::PUT, Method::POST])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let auth_routes = get_auth_router(ROUTE_PREFIX).await?;

    let protected_routes = Router::new()
        .merge(get_user_router(ROUTE_PREFIX).await?)
        .merge(get_group_router(ROUTE_PREFIX).await?)
        .merge(get_permission_router(ROUTE_PREFIX).await?)
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth_api_middleware,
        ));

    let media = ServeDir::new(&app_state.config.media_root);

    Ok(Router::new()
        .route(&format!("{}/healthcheck", ROUTE_PREFIX), get(health_check))
        .merge(auth_routes)
        .merge(protected_routes)
        .nest_service(&format!("{}/media", ROUTE_PREFIX), media)
        .with_state(app_state)
        .layer(cors))
}
