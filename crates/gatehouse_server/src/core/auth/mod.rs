pub mod middleware;
pub mod route;
pub mod schema;
