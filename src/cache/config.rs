//! Feed cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_FEED_TTL_SECS: u64 = 20;
const DEFAULT_MAX_ENTRIES: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve the main feed from the cache at all.
    pub enabled: bool,
    /// How long a rendered feed page is served before it is rebuilt.
    pub feed_ttl_seconds: u64,
    /// Upper bound on stored variants (page number × viewer).
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            feed_ttl_seconds: DEFAULT_FEED_TTL_SECS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            feed_ttl_seconds: settings.feed_ttl.as_secs(),
            max_entries: settings.max_entries.get() as usize,
        }
    }
}

impl CacheConfig {
    pub fn feed_ttl(&self) -> Duration {
        Duration::from_secs(self.feed_ttl_seconds)
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}
