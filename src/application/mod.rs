pub mod applications;
pub mod auth;
pub mod contacts;
pub mod error;
pub mod events;
pub mod journals;
pub mod pagination;
pub mod repos;
pub mod validate;
