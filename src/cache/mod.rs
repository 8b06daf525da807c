//! Response cache for the main feed.
//!
//! The rendered feed is kept for a fixed time-to-live and replayed byte for
//! byte, so new or deleted posts show up only once the entry expires.
//!
//! ```toml
//! [cache]
//! enabled = true
//! feed_ttl_seconds = 20
//! max_entries = 64
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::{FEED_CACHE_KEY, feed_key, page_param};
pub use middleware::{CacheState, response_cache_layer};
pub use store::{CacheStoreError, CachedResponse, FeedCache, Lookup, buffer_response, should_store_response};
