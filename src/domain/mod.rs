pub mod entities;
pub mod error;
pub mod files;
pub mod types;
