//! # Rate Limiting
//!
//! Fixed-window per-IP rate limiting over an external TTL-expiring counter
//! store. The get-then-put increment is best-effort: concurrent requests
//! from the same client may race past the limit, which is acceptable for
//! abuse mitigation. Store failures never block a request.

use crate::error::{PaymentError, PaymentResult};
use crate::gate::{RateLimitConfig, Rejection};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// TTL-expiring counter store (get/put), the only state shared across
/// requests. Backed by a KV namespace in production; [`MemoryRateLimitStore`]
/// stands in for single-process deployments and tests.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> PaymentResult<Option<u32>>;

    async fn put(&self, key: &str, count: u32, ttl: Duration) -> PaymentResult<()>;
}

/// In-process counter store with per-entry expiry
#[derive(Default)]
pub struct MemoryRateLimitStore {
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    count: u32,
    expires_at: Instant,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn get(&self, key: &str) -> PaymentResult<Option<u32>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PaymentError::Internal("rate limit store lock poisoned".to_string()))?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.count)),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, count: u32, ttl: Duration) -> PaymentResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PaymentError::Internal("rate limit store lock poisoned".to_string()))?;

        entries.insert(
            key.to_string(),
            Entry {
                count,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

/// The rate-limit gate: checks and increments the per-IP counter
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window: Duration,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            enabled: config.enabled,
        }
    }

    /// Returns the rejection when the client is over the limit, otherwise
    /// increments its counter. Store errors are logged and fail open.
    pub async fn check(&self, client_ip: &str) -> Option<Rejection> {
        if !self.enabled {
            return None;
        }

        let key = format!("rate_limit:{client_ip}");

        let count = match self.store.get(&key).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Rate limit store error (allowing request): {e}");
                return None;
            }
        };

        let next = match count {
            Some(count) if count >= self.max_requests => {
                return Some(Rejection::new(429, "Too many requests"));
            }
            Some(count) => count + 1,
            None => 1,
        };

        if let Err(e) = self.store.put(&key, next, self.window).await {
            warn!("Rate limit store error (allowing request): {e}");
        }

        None
    }
}
