//! In-memory upload rate limiting.
//!
//! Fixed-window counters keyed by client IP, sharded across several mutexes
//! to keep lock contention down. The store is bounded: expired buckets are
//! dropped opportunistically and the oldest bucket is evicted once a shard
//! hits capacity, so the map cannot grow without limit under an address
//! churn attack. A background task calls [`UploadRateLimiter::cleanup_expired_buckets`]
//! periodically.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// One client's fixed-window counter.
#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    /// Count this request against the window. The window re-anchors to
    /// now + `window` on expiry, so the first request after a quiet period
    /// always lands in a fresh window with count 1.
    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Sharded fixed-window rate limiter for the upload endpoint.
#[derive(Clone)]
pub struct UploadRateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RateLimitBucket>>>>,
    shard_count: usize,
    limit: u32,
    window: Duration,
    /// Maximum buckets per shard before eviction kicks in.
    max_buckets_per_shard: usize,
}

impl UploadRateLimiter {
    /// Create a limiter with the default shard count (16).
    pub fn new(limit: u32, window_secs: u64, max_clients: usize) -> Self {
        Self::with_shards(limit, window_secs, max_clients, 16)
    }

    pub fn with_shards(
        limit: u32,
        window_secs: u64,
        max_clients: usize,
        shard_count: usize,
    ) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            shard_count,
            limit,
            window: Duration::from_secs(window_secs),
            max_buckets_per_shard: (max_clients / shard_count).max(1),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shard_count
    }

    /// Record one request for `key`.
    ///
    /// Returns the remaining allowance in the current window, or the time
    /// until the window resets when the client is over its limit.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, Duration> {
        let shard = &self.shards[self.shard_index(key)];
        let mut buckets = shard.lock().await;

        if buckets.len() >= self.max_buckets_per_shard {
            let now = Instant::now();
            let grace = self.window;
            buckets.retain(|_, bucket| {
                bucket.reset_at > now || now.duration_since(bucket.reset_at) < grace
            });

            // Still full after dropping expired entries: evict the bucket
            // closest to reset so active clients keep their counters.
            if buckets.len() >= self.max_buckets_per_shard {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());
                if let Some(key_to_remove) = oldest_key {
                    buckets.remove(&key_to_remove);
                    tracing::debug!(
                        removed_key = %key_to_remove,
                        remaining_buckets = buckets.len(),
                        "Evicted oldest rate limit bucket at capacity"
                    );
                }
            }
        }

        let window = self.window;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(window));

        let (allowed, remaining) = bucket.check_and_increment(self.limit, window);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }

    /// Drop buckets that expired more than one window ago, across all shards.
    pub async fn cleanup_expired_buckets(&self) {
        let now = Instant::now();
        let grace = self.window;
        let mut total_cleaned = 0;

        let cleanup_tasks: Vec<_> = self
            .shards
            .iter()
            .map(|shard| {
                let shard = shard.clone();
                tokio::spawn(async move {
                    let mut buckets = shard.lock().await;
                    let before = buckets.len();
                    buckets.retain(|_, bucket| {
                        bucket.reset_at > now || now.duration_since(bucket.reset_at) < grace
                    });
                    before - buckets.len()
                })
            })
            .collect();

        for task in cleanup_tasks {
            if let Ok(cleaned) = task.await {
                total_cleaned += cleaned;
            }
        }

        if total_cleaned > 0 {
            tracing::debug!(
                buckets_cleaned = total_cleaned,
                "Cleaned up expired rate limit buckets"
            );
        }
    }

    /// Spawn the periodic cleanup task. Runs for the life of the process.
    pub fn spawn_cleanup_task(&self, interval_secs: u64) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                limiter.cleanup_expired_buckets().await;
            }
        });
    }
}
