use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_LIST_TTL_SECS: u64 = 600;
pub const DEFAULT_DETAIL_TTL_SECS: u64 = 900;
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub list_ttl: Duration,
    pub detail_ttl: Duration,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            list_ttl: Duration::from_secs(DEFAULT_LIST_TTL_SECS),
            detail_ttl: Duration::from_secs(DEFAULT_DETAIL_TTL_SECS),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity.max(1)).unwrap_or(NonZeroUsize::MIN)
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            list_ttl: Duration::from_secs(settings.list_ttl_seconds.get()),
            detail_ttl: Duration::from_secs(settings.detail_ttl_seconds.get()),
            capacity: settings.capacity.get(),
        }
    }
}
