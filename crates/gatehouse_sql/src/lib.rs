pub mod base;
pub mod enums;
pub mod postgres;
pub mod registry;
pub mod schemas;
pub mod sqlite;
