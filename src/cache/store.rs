//! Keyed response store with a fixed time-to-live.
//!
//! Entries are populated on miss and served verbatim until they expire.
//! Expiry is lazy: the read that finds a stale entry evicts it. Writes to
//! posts do not touch the store.

use std::sync::Mutex;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use lru::LruCache;
use thiserror::Error;
use tokio::time::Instant;

use super::{CacheConfig, lock::mutex_lock};

const SOURCE: &str = "yatube::cache::store";

/// A buffered response that can be replayed byte for byte.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let stored_headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            status,
            headers: stored_headers,
            body,
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

#[derive(Debug, Clone)]
struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// Outcome of a lookup, for logging and metrics.
#[derive(Debug, Clone)]
pub enum Lookup {
    Hit(CachedResponse),
    Expired,
    Miss,
}

pub struct FeedCache {
    entries: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

impl FeedCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.max_entries_non_zero())),
            ttl: config.feed_ttl(),
        }
    }

    pub fn lookup(&self, key: &str) -> Lookup {
        let now = Instant::now();
        let mut entries = mutex_lock(&self.entries, SOURCE, "lookup");
        let fresh = entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.response.clone()));
        match fresh {
            Some(Some(response)) => Lookup::Hit(response),
            Some(None) => {
                entries.pop(key);
                Lookup::Expired
            }
            None => Lookup::Miss,
        }
    }

    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        match self.lookup(key) {
            Lookup::Hit(response) => Some(response),
            Lookup::Expired | Lookup::Miss => None,
        }
    }

    /// Store a response; a concurrent writer for the same key simply wins last.
    pub fn put(&self, key: String, response: CachedResponse) {
        let entry = Entry {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        mutex_lock(&self.entries, SOURCE, "put").put(key, entry);
    }

    pub fn clear(&self) {
        mutex_lock(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

pub fn should_store_response(response: &Response) -> bool {
    use axum::http::header;

    response.status() == StatusCode::OK && !response.headers().contains_key(header::SET_COOKIE)
}

/// Collect the body so it can be both stored and sent.
pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}
