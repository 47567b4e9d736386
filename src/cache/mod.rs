//! Response cache for the public read endpoints.

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{Family, ResponseKey, hash_value};
pub use store::{CachedPayload, ResponseCache};
