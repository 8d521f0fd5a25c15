use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{CacheError, RevocationCache};

const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(500);

/// Redis-backed revocation cache
///
/// Every command is bounded by the operation timeout. A revocation is a
/// single `SET key value EX ttl`, so a dropped or timed-out call never leaves
/// a half-written entry.
#[derive(Clone)]
pub struct RedisRevocationCache {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisRevocationCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        tracing::info!("Connected to redis revocation cache");
        Ok(Self {
            conn,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

/// Redis expiry is whole seconds; round up and never go below one second
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl RevocationCache for RedisRevocationCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("EXISTS")
                .arg(key)
                .query_async::<_, bool>(&mut conn)
                .await
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let secs = ttl_seconds(ttl);
        self.bounded(async move {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(secs)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
        })
        .await
        .map(|_| ())
    }
}
