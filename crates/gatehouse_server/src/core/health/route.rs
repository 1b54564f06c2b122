use crate::core::health::schema::Alive;
use axum::Json;

pub async fn health_check() -> Json<Alive> {
    Json(Alive::default())
}
