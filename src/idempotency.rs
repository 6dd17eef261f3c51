//! Idempotency guard for order event forwarding.
//!
//! An order id moves `Unknown -> Processed` only after its event was accepted
//! downstream, and back to `Unknown` once the retention TTL elapses. Failed
//! forwards leave no trace, so the next webhook delivery retries them.
//!
//! Check-then-mark is not atomic across the pipeline: two concurrent deliveries
//! of the same order may both forward. That small window is accepted.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::AppError;
use crate::webhook_models::OrderId;

/// Shared key-value store with per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Whether an unexpired entry exists for `key`.
    async fn contains(&self, key: &str) -> Result<bool, AppError>;

    /// Stores `key`, replacing any existing entry, for `ttl`.
    async fn put_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), AppError>;
}

/// Per-entry expiry: each value is the TTL it was inserted with.
struct EntryTtl;

impl Expiry<String, Duration> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        ttl: &Duration,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(*ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        ttl: &Duration,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(*ttl)
    }
}

/// In-process store backed by moka. Not shared across instances or restarts.
///
/// Unbounded: entries leave only when their TTL elapses, so a marked order is
/// never evicted early under load.
#[derive(Clone)]
pub struct InMemoryStore {
    cache: Cache<String, Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let cache = Cache::builder().expire_after(EntryTtl).build();
        Self { cache }
    }

    /// Number of live entries, after pending expirations are applied.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn contains(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.cache.get(key).await.is_some())
    }

    async fn put_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), AppError> {
        self.cache.insert(key.to_string(), ttl).await;
        Ok(())
    }
}

/// Redis-backed store, shared by every instance pointing at the same server.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn contains(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.connection.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }

    async fn put_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.connection.clone();
        // PX rejects 0, so sub-millisecond TTLs round up
        let ttl_ms = (ttl.as_millis() as u64).max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// Tracks which orders already produced a forwarded "Placed Order" event.
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn has_been_processed(&self, order_id: OrderId) -> Result<bool, AppError> {
        self.store.contains(&cache_key(order_id)).await
    }

    /// Marks the order processed for the guard's default retention window.
    pub async fn mark_processed(&self, order_id: OrderId) -> Result<(), AppError> {
        self.mark_processed_for(order_id, self.ttl).await
    }

    pub async fn mark_processed_for(
        &self,
        order_id: OrderId,
        ttl: Duration,
    ) -> Result<(), AppError> {
        self.store.put_with_ttl(&cache_key(order_id), ttl).await?;
        tracing::debug!("Marked order {} as processed for {:?}", order_id, ttl);
        Ok(())
    }
}

fn cache_key(order_id: OrderId) -> String {
    format!("klaviyo_order_{}", order_id)
}
