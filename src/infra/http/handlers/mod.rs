pub mod applications;
pub mod auth;
pub mod blobs;
pub mod contacts;
pub mod events;
pub mod journals;
