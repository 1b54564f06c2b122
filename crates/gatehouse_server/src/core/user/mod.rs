pub mod form;
pub mod image;
pub mod route;
pub mod schema;
pub mod validate;
