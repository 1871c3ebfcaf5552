//! Core nscache functionality
//!
//! This module contains the `NamespacedCache` facade. Every operation builds
//! a namespaced key and issues one backend command (plus an EXPIRE when a
//! TTL is given).
//!
//! Operations come in two flavours:
//! - `try_*` methods return [`NsResult`] so callers can tell an empty result
//!   from a failed one;
//! - the plain methods are fail-soft: errors are logged with the key (and
//!   value, for writes) and turned into `false`, `None` or `0`.
//!
//! Counters are the exception: [`NamespacedCache::increment`] always
//! propagates, since no default is a safe stand-in for a counter value.

use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::sync::Arc;

use cache_system::{CacheBackend, RedisBackend};
use config::AppConfig;

use crate::errors::{NsCacheError, NsResult};
use crate::keys::{KeyCategory, KeyNamespace};

/// Namespaced, fail-soft facade over a [`CacheBackend`]
pub struct NamespacedCache<B: CacheBackend> {
    backend: Arc<B>,
    namespace: Arc<KeyNamespace>,
}

impl<B: CacheBackend> Clone for NamespacedCache<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            namespace: Arc::clone(&self.namespace),
        }
    }
}

impl<B: CacheBackend + Debug> Debug for NamespacedCache<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespacedCache")
            .field("namespace", &self.namespace)
            .field("backend", &self.backend)
            .finish()
    }
}

impl NamespacedCache<RedisBackend> {
    /// Create a Redis-backed cache from loaded configuration
    pub fn from_config(config: &AppConfig) -> NsResult<Self> {
        config.validate()?;
        let backend = RedisBackend::new(config.cache.clone())?;
        Ok(Self::with_namespace(
            Arc::new(backend),
            KeyNamespace::from(&config.namespace),
        ))
    }

    /// Load configuration (see [`AppConfig::load`]) and create a Redis-backed cache
    pub fn from_env() -> NsResult<Self> {
        let config = AppConfig::load()?;
        Self::from_config(&config)
    }
}

impl<B: CacheBackend> NamespacedCache<B> {
    /// Create a cache over `backend` using the default `cb:users` namespace
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_namespace(backend, KeyNamespace::default())
    }

    pub fn with_namespace(backend: Arc<B>, namespace: KeyNamespace) -> Self {
        Self {
            backend,
            namespace: Arc::new(namespace),
        }
    }

    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Rendered key for a category and any number of segments
    pub fn key_for<S: AsRef<str>>(&self, category: KeyCategory, segments: &[S]) -> String {
        self.namespace.key(category, segments)
    }

    fn key(&self, category: KeyCategory, k: &str) -> String {
        self.namespace.key(category, &[k])
    }

    async fn apply_ttl(&self, key: &str, ttl_seconds: i64) -> NsResult<()> {
        if ttl_seconds > 0 {
            self.backend
                .expire(key, ttl_seconds as u64)
                .await
                .map_err(NsCacheError::backend(key))?;
        }
        Ok(())
    }

    fn write_failed(&self, category: KeyCategory, k: &str, value: &dyn Debug, error: &NsCacheError) {
        tracing::error!(
            key = %self.key(category, k),
            value = ?value,
            error = %error,
            "failed to write cache entry"
        );
    }

    fn read_failed(&self, key: &str, operation: &str, error: &NsCacheError) {
        tracing::error!(key = %key, operation, error = %error, "cache operation failed");
    }

    // ---- scalar values ----

    /// Store `v` under the value key. A positive `ttl_seconds` sets the
    /// expiration; otherwise any existing expiration is left as it is.
    pub async fn try_set_value(&self, k: &str, v: &str, ttl_seconds: i64) -> NsResult<()> {
        let key = self.key(KeyCategory::Value, k);
        debug_log!("set value [{}] ttl={}", key, ttl_seconds);
        self.backend
            .set(&key, v)
            .await
            .map_err(NsCacheError::backend(&key))?;
        self.apply_ttl(&key, ttl_seconds).await
    }

    pub async fn set_value(&self, k: &str, v: &str) -> bool {
        self.set_value_with_ttl(k, v, -1).await
    }

    pub async fn set_value_with_ttl(&self, k: &str, v: &str, ttl_seconds: i64) -> bool {
        match self.try_set_value(k, v, ttl_seconds).await {
            Ok(()) => true,
            Err(e) => {
                self.write_failed(KeyCategory::Value, k, &v, &e);
                false
            }
        }
    }

    /// Add 1 to the counter under the value key, creating it if absent.
    pub async fn increment(&self, k: &str) -> NsResult<i64> {
        self.increment_by(k, 1).await
    }

    /// Add `step` to the counter under the value key, creating it at `step` if absent.
    pub async fn increment_by(&self, k: &str, step: i64) -> NsResult<i64> {
        let key = self.key(KeyCategory::Value, k);
        debug_log!("increment [{}] by {}", key, step);
        self.backend
            .incr_by(&key, step)
            .await
            .map_err(NsCacheError::backend(&key))
    }

    pub async fn try_get_value(&self, k: &str) -> NsResult<Option<String>> {
        let key = self.key(KeyCategory::Value, k);
        trace_log!("get value [{}]", key);
        self.backend
            .get(&key)
            .await
            .map_err(NsCacheError::backend(&key))
    }

    pub async fn get_value(&self, k: &str) -> Option<String> {
        self.try_get_value(k).await.unwrap_or_else(|e| {
            self.read_failed(&self.key(KeyCategory::Value, k), "get_value", &e);
            None
        })
    }

    // ---- existence and removal ----

    /// Existence check on an already built key
    pub async fn try_contains_key(&self, key: &str) -> NsResult<bool> {
        self.backend
            .exists(key)
            .await
            .map_err(NsCacheError::backend(key))
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.try_contains_key(key).await.unwrap_or_else(|e| {
            self.read_failed(key, "exists", &e);
            false
        })
    }

    pub async fn try_exists(&self, category: KeyCategory, k: &str) -> NsResult<bool> {
        self.try_contains_key(&self.key(category, k)).await
    }

    pub async fn exists(&self, category: KeyCategory, k: &str) -> bool {
        self.contains_key(&self.key(category, k)).await
    }

    pub async fn contains_value_key(&self, k: &str) -> bool {
        self.exists(KeyCategory::Value, k).await
    }

    pub async fn contains_set_key(&self, k: &str) -> bool {
        self.exists(KeyCategory::Set, k).await
    }

    pub async fn contains_list_key(&self, k: &str) -> bool {
        self.exists(KeyCategory::List, k).await
    }

    /// Delete an already built key. `Ok(false)` when there was nothing to delete.
    pub async fn try_remove_key(&self, key: &str) -> NsResult<bool> {
        debug_log!("remove [{}]", key);
        self.backend
            .del(key)
            .await
            .map_err(NsCacheError::backend(key))
    }

    /// Delete an already built key. `true` unless the backend failed.
    pub async fn remove(&self, key: &str) -> bool {
        match self.try_remove_key(key).await {
            Ok(_) => true,
            Err(e) => {
                self.read_failed(key, "remove", &e);
                false
            }
        }
    }

    pub async fn try_remove(&self, category: KeyCategory, k: &str) -> NsResult<bool> {
        self.try_remove_key(&self.key(category, k)).await
    }

    pub async fn remove_value(&self, k: &str) -> bool {
        self.remove(&self.key(KeyCategory::Value, k)).await
    }

    pub async fn remove_set(&self, k: &str) -> bool {
        self.remove(&self.key(KeyCategory::Set, k)).await
    }

    pub async fn remove_list(&self, k: &str) -> bool {
        self.remove(&self.key(KeyCategory::List, k)).await
    }

    /// Remaining time to live in seconds, `None` for a missing or persistent key
    pub async fn try_key_ttl(&self, category: KeyCategory, k: &str) -> NsResult<Option<u64>> {
        let key = self.key(category, k);
        self.backend
            .ttl(&key)
            .await
            .map_err(NsCacheError::backend(&key))
    }

    pub async fn key_ttl(&self, category: KeyCategory, k: &str) -> Option<u64> {
        self.try_key_ttl(category, k).await.unwrap_or_else(|e| {
            self.read_failed(&self.key(category, k), "ttl", &e);
            None
        })
    }

    // ---- sets ----

    /// Add members to the set key. Returns how many were new.
    pub async fn try_add_to_set<I>(&self, k: &str, members: I, ttl_seconds: i64) -> NsResult<u64>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let key = self.key(KeyCategory::Set, k);
        let members: Vec<String> = members
            .into_iter()
            .map(|member| member.as_ref().to_string())
            .collect();
        if members.is_empty() {
            return Err(NsCacheError::EmptyBatch(key));
        }

        debug_log!("add {} member(s) to set [{}]", members.len(), key);
        let added = self
            .backend
            .sadd(&key, &members)
            .await
            .map_err(NsCacheError::backend(&key))?;
        self.apply_ttl(&key, ttl_seconds).await?;
        Ok(added)
    }

    pub async fn add_to_set(&self, k: &str, v: &str) -> bool {
        self.add_to_set_with_ttl(k, v, -1).await
    }

    pub async fn add_to_set_with_ttl(&self, k: &str, v: &str, ttl_seconds: i64) -> bool {
        match self.try_add_to_set(k, [v], ttl_seconds).await {
            Ok(_) => true,
            Err(e) => {
                self.write_failed(KeyCategory::Set, k, &v, &e);
                false
            }
        }
    }

    pub async fn add_all_to_set(&self, k: &str, v: &HashSet<String>) -> bool {
        self.add_all_to_set_with_ttl(k, v, -1).await
    }

    pub async fn add_all_to_set_with_ttl(
        &self,
        k: &str,
        v: &HashSet<String>,
        ttl_seconds: i64,
    ) -> bool {
        match self.try_add_to_set(k, v, ttl_seconds).await {
            Ok(_) => true,
            Err(e) => {
                self.write_failed(KeyCategory::Set, k, v, &e);
                false
            }
        }
    }

    pub async fn try_get_set(&self, k: &str) -> NsResult<HashSet<String>> {
        let key = self.key(KeyCategory::Set, k);
        trace_log!("get set members [{}]", key);
        self.backend
            .smembers(&key)
            .await
            .map_err(NsCacheError::backend(&key))
    }

    /// All members of the set key; empty when the key is missing.
    pub async fn get_set(&self, k: &str) -> Option<HashSet<String>> {
        match self.try_get_set(k).await {
            Ok(members) => Some(members),
            Err(e) => {
                self.read_failed(&self.key(KeyCategory::Set, k), "get_set", &e);
                None
            }
        }
    }

    // ---- lists ----

    /// Append values to the tail of the list key, in order. Returns the new length.
    pub async fn try_push_to_list<I>(&self, k: &str, values: I, ttl_seconds: i64) -> NsResult<u64>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let key = self.key(KeyCategory::List, k);
        let values: Vec<String> = values
            .into_iter()
            .map(|value| value.as_ref().to_string())
            .collect();
        if values.is_empty() {
            return Err(NsCacheError::EmptyBatch(key));
        }

        debug_log!("push {} value(s) to list [{}]", values.len(), key);
        let len = self
            .backend
            .rpush(&key, &values)
            .await
            .map_err(NsCacheError::backend(&key))?;
        self.apply_ttl(&key, ttl_seconds).await?;
        Ok(len)
    }

    pub async fn push_to_list(&self, k: &str, v: &str) -> bool {
        self.push_to_list_with_ttl(k, v, -1).await
    }

    pub async fn push_to_list_with_ttl(&self, k: &str, v: &str, ttl_seconds: i64) -> bool {
        match self.try_push_to_list(k, [v], ttl_seconds).await {
            Ok(_) => true,
            Err(e) => {
                self.write_failed(KeyCategory::List, k, &v, &e);
                false
            }
        }
    }

    pub async fn push_all_to_list<S>(&self, k: &str, v: &[S]) -> bool
    where
        S: AsRef<str> + Debug,
    {
        self.push_all_to_list_with_ttl(k, v, -1).await
    }

    pub async fn push_all_to_list_with_ttl<S>(&self, k: &str, v: &[S], ttl_seconds: i64) -> bool
    where
        S: AsRef<str> + Debug,
    {
        match self.try_push_to_list(k, v, ttl_seconds).await {
            Ok(_) => true,
            Err(e) => {
                self.write_failed(KeyCategory::List, k, &v, &e);
                false
            }
        }
    }

    /// Elements `start..=end` of the list key; negative indices count from the tail.
    pub async fn try_get_list_range(&self, k: &str, start: i64, end: i64) -> NsResult<Vec<String>> {
        let key = self.key(KeyCategory::List, k);
        trace_log!("get list range [{}] {}..={}", key, start, end);
        self.backend
            .lrange(&key, start, end)
            .await
            .map_err(NsCacheError::backend(&key))
    }

    pub async fn get_list_range(&self, k: &str, start: i64, end: i64) -> Option<Vec<String>> {
        match self.try_get_list_range(k, start, end).await {
            Ok(values) => Some(values),
            Err(e) => {
                self.read_failed(&self.key(KeyCategory::List, k), "get_list_range", &e);
                None
            }
        }
    }

    pub async fn try_get_list_size(&self, k: &str) -> NsResult<u64> {
        let key = self.key(KeyCategory::List, k);
        self.backend
            .llen(&key)
            .await
            .map_err(NsCacheError::backend(&key))
    }

    /// Length of the list key, usable for paging. 0 when missing.
    pub async fn get_list_size(&self, k: &str) -> u64 {
        self.try_get_list_size(k).await.unwrap_or_else(|e| {
            self.read_failed(&self.key(KeyCategory::List, k), "get_list_size", &e);
            0
        })
    }

    /// Remove the tail element of the list key and return it.
    pub async fn try_pop_from_list(&self, k: &str) -> NsResult<Option<String>> {
        let key = self.key(KeyCategory::List, k);
        debug_log!("pop from list [{}]", key);
        self.backend
            .rpop(&key)
            .await
            .map_err(NsCacheError::backend(&key))
    }

    /// Remove and discard the tail element of the list key.
    pub async fn pop_from_list(&self, k: &str) -> bool {
        match self.try_pop_from_list(k).await {
            Ok(_) => true,
            Err(e) => {
                self.read_failed(&self.key(KeyCategory::List, k), "pop_from_list", &e);
                false
            }
        }
    }

    /// Check backend connectivity
    pub async fn ping(&self) -> NsResult<String> {
        Ok(self.backend.ping().await?)
    }
}
