//! Response cache middleware for the main feed.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Method, Request},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tracing::{debug, instrument, warn};

use super::{
    CacheConfig,
    keys::{feed_key, page_param},
    store::{FeedCache, Lookup, buffer_response, should_store_response},
};

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub feed: Arc<FeedCache>,
    /// Header carrying the signed-in username; part of the cache key.
    pub viewer_header: HeaderName,
}

impl CacheState {
    pub fn new(config: CacheConfig, viewer_header: HeaderName) -> Self {
        let feed = Arc::new(FeedCache::new(&config));
        Self {
            config,
            feed,
            viewer_header,
        }
    }
}

/// Serve GET requests from the feed cache, populating it on miss.
///
/// Only `200 OK` responses without cookies are stored. Nothing but time
/// invalidates an entry.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let page = page_param(request.uri().query());
    let viewer = request
        .headers()
        .get(&cache.viewer_header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let key = feed_key(page.as_deref(), viewer);

    match cache.feed.lookup(&key) {
        Lookup::Hit(cached) => {
            counter!("yatube_feed_cache_hit_total").increment(1);
            debug!(cache = "feed", outcome = "hit", key = %key, "serving cached response");
            return cached.into_response();
        }
        Lookup::Expired => {
            counter!("yatube_feed_cache_miss_total", "reason" => "expired").increment(1);
            debug!(cache = "feed", outcome = "expired", key = %key, "cached response expired");
        }
        Lookup::Miss => {
            counter!("yatube_feed_cache_miss_total", "reason" => "absent").increment(1);
            debug!(cache = "feed", outcome = "miss", key = %key, "cache miss, executing handler");
        }
    }

    let response = next.run(request).await;
    if !should_store_response(&response) {
        return response;
    }

    match buffer_response(response).await {
        Ok((rebuilt, cached)) => {
            cache.feed.put(key, cached);
            counter!("yatube_feed_cache_store_total").increment(1);
            rebuilt
        }
        Err((rebuilt, error)) => {
            warn!(cache = "feed", error = %error, "failed to buffer response for caching");
            rebuilt
        }
    }
}
