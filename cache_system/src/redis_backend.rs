//! Redis backend implementation
//!
//! This module provides the `RedisBackend` struct which runs the
//! `CacheBackend` commands against a Redis server over a shared
//! multiplexed connection.

use crate::backend::CacheBackend;
use crate::errors::CacheError;
use async_trait::async_trait;
use config::CacheConfig;
use redis::{AsyncCommands, Client, SetExpiry, SetOptions};
use std::collections::HashSet;
use std::fmt::Debug;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Redis-backed command executor
#[derive(Clone)]
pub struct RedisBackend {
    client: Arc<Client>,
    config: Arc<CacheConfig>,
    connection: Arc<RwLock<Option<redis::aio::MultiplexedConnection>>>,
}

impl Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = match self.connection.try_read() {
            Ok(conn) => {
                if conn.is_some() {
                    "connected"
                } else {
                    "no_connection"
                }
            }
            Err(_) => "lock_error",
        };

        f.debug_struct("RedisBackend")
            .field("config", &self.config)
            .field("connected", &connection_status)
            .finish()
    }
}

impl RedisBackend {
    /// Create a new backend. No connection is opened until the first command.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// Get or create the shared Redis connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut slot = self.connection.write().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let connect_timeout = Duration::from_millis(self.config.connection_timeout_ms);
        let conn = tokio::time::timeout(
            connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| CacheError::Timeout)??;

        #[cfg(feature = "debug-logging")]
        tracing::debug!(redis_url = %self.config.redis_url, "opened redis connection");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Await a command, bounded by the configured response timeout
    async fn timed<T, F>(&self, command: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        let response_timeout = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(response_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if drops_connection(&e) {
                    self.reset_connection().await;
                }
                Err(e.into())
            }
            Err(_) => Err(CacheError::Timeout),
        }
    }

    /// Forget the shared connection so the next command reconnects
    async fn reset_connection(&self) {
        if self.connection.write().await.take().is_some() {
            tracing::warn!(
                redis_url = %self.config.redis_url,
                "redis connection lost, reconnecting on next command"
            );
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

/// A multiplexed connection does not recover from these on its own
fn drops_connection(error: &redis::RedisError) -> bool {
    error.is_connection_dropped() || error.is_unrecoverable_error()
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let options = SetOptions::default().with_expiration(SetExpiry::KEEPTTL);
        self.timed::<(), _>(conn.set_options(key, value, options))
            .await
    }

    async fn incr_by(&self, key: &str, step: i64) -> Result<i64, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.incr(key, step)).await
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.get_connection().await?;
        let removed: i64 = self.timed(conn.del(key)).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.exists(key)).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, CacheError> {
        let seconds = i64::try_from(seconds)
            .map_err(|_| CacheError::General(format!("TTL out of range: {}", seconds)))?;
        let mut conn = self.get_connection().await?;
        self.timed(conn.expire(key, seconds)).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let mut conn = self.get_connection().await?;
        // -2: no such key, -1: key without expiry
        let ttl: i64 = self.timed(conn.ttl(key)).await?;
        Ok(u64::try_from(ttl).ok())
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.sadd(key, members)).await
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.smembers(key)).await
    }

    async fn rpush(&self, key: &str, values: &[String]) -> Result<u64, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.rpush(key, values)).await
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.lrange(key, start as isize, stop as isize))
            .await
    }

    async fn llen(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.llen(key)).await
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.rpop(key, None::<NonZeroUsize>)).await
    }

    async fn ping(&self) -> Result<String, CacheError> {
        let mut conn = self.get_connection().await?;
        self.timed(redis::cmd("PING").query_async(&mut conn)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_connect() {
        let backend = RedisBackend::new(CacheConfig::default()).unwrap();
        assert_eq!(backend.config().redis_url, "redis://localhost:6379");
        assert!(format!("{:?}", backend).contains("no_connection"));
    }

    #[test]
    fn test_dropped_connection_classification() {
        let broken_pipe = redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "connection closed by peer",
        ));
        assert!(drops_connection(&broken_pipe));

        let type_error = redis::RedisError::from((redis::ErrorKind::TypeError, "unexpected reply"));
        assert!(!drops_connection(&type_error));
    }

    #[tokio::test]
    async fn test_dropped_connection_clears_slot() {
        let backend = RedisBackend::new(CacheConfig::default()).unwrap();
        let dropped = async {
            Err::<(), _>(redis::RedisError::from(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )))
        };

        let result = backend.timed(dropped).await;
        assert!(matches!(result, Err(CacheError::ConnectionError(_))));
        assert!(backend.connection.read().await.is_none());
        assert!(format!("{:?}", backend).contains("no_connection"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = RedisBackend::new(CacheConfig::new("not a url".to_string(), 100, 100));
        assert!(matches!(result, Err(CacheError::ConnectionError(_))));
    }
}
