//! Backend command interface
//!
//! The minimal set of string, set and list commands the namespaced cache
//! needs from a key-value store. Keys passed here are already fully built.

use crate::errors::CacheError;
use async_trait::async_trait;
use std::collections::HashSet;

/// Key-value store commands, modelled on their Redis counterparts.
///
/// Implementations must be safe to share between tasks.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// GET. `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// SET, keeping any expiration already attached to the key.
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// INCRBY. Returns the value after the increment.
    async fn incr_by(&self, key: &str, step: i64) -> Result<i64, CacheError>;

    /// DEL. Returns whether a key was removed.
    async fn del(&self, key: &str) -> Result<bool, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// EXPIRE. Returns `false` when the key does not exist.
    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, CacheError>;

    /// Remaining time to live in seconds; `None` for a missing key or a key without expiry.
    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError>;

    /// SADD. Returns the number of members that were not already present.
    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, CacheError>;

    async fn smembers(&self, key: &str) -> Result<HashSet<String>, CacheError>;

    /// RPUSH. Returns the list length after the push.
    async fn rpush(&self, key: &str, values: &[String]) -> Result<u64, CacheError>;

    /// LRANGE with inclusive bounds; negative indices count from the tail.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError>;

    async fn llen(&self, key: &str) -> Result<u64, CacheError>;

    /// RPOP of a single element.
    async fn rpop(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn ping(&self) -> Result<String, CacheError>;
}
