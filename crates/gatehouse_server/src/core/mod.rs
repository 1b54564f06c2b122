pub mod auth;
pub mod error;
pub mod group;
pub mod health;
pub mod permission;
pub mod router;
pub mod setup;
pub mod state;
pub mod user;
