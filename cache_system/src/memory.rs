//! In-process backend
//!
//! `MemoryBackend` keeps strings, sets and lists in a map and follows the
//! Redis semantics the namespaced cache relies on: wrong-type errors, lazy
//! expiration, inclusive list ranges with negative indices. It can be told
//! to fail every command, which is how the fail-soft paths are tested.

use crate::backend::CacheBackend;
use crate::errors::CacheError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Data {
    Str(String),
    Set(HashSet<String>),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    data: Data,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(data: Data) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-memory `CacheBackend`
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
    failing: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command fail with a connection error (or recover)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Connection(
                "memory backend is unavailable".to_string(),
            ));
        }
        Ok(())
    }

    /// Read access to a live entry
    async fn read_entry<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&Entry>) -> Result<T, CacheError> + Send,
    ) -> Result<T, CacheError> {
        self.check_available()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        f(entries.get(key).filter(|entry| entry.is_live(now)))
    }

    /// Write access to the entry slot, with an expired entry already dropped
    async fn write_entry<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, Entry>) -> Result<T, CacheError> + Send,
    ) -> Result<T, CacheError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        f(&mut entries)
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::WrongType(key.to_string())
}

/// Resolve LRANGE bounds against a list length, `None` when the range is empty
fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.read_entry(key, |entry| match entry.map(|e| &e.data) {
            None => Ok(None),
            Some(Data::Str(value)) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.write_entry(key, |entries| {
            let data = Data::Str(value.to_string());
            match entries.get_mut(key) {
                Some(entry) => entry.data = data,
                None => {
                    entries.insert(key.to_string(), Entry::new(data));
                }
            }
            Ok(())
        })
        .await
    }

    async fn incr_by(&self, key: &str, step: i64) -> Result<i64, CacheError> {
        self.write_entry(key, |entries| {
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(Data::Str("0".to_string())));
            let Data::Str(current) = &mut entry.data else {
                return Err(wrong_type(key));
            };
            let next = current
                .parse::<i64>()
                .ok()
                .and_then(|n| n.checked_add(step))
                .ok_or_else(|| CacheError::NotAnInteger(key.to_string()))?;
            *current = next.to_string();
            Ok(next)
        })
        .await
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        self.write_entry(key, |entries| Ok(entries.remove(key).is_some()))
            .await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.read_entry(key, |entry| Ok(entry.is_some())).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, CacheError> {
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(seconds))
            .ok_or_else(|| CacheError::General(format!("invalid expire time: {}", seconds)))?;
        self.write_entry(key, |entries| match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        })
        .await
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError> {
        self.read_entry(key, |entry| {
            let now = Instant::now();
            Ok(entry.and_then(|e| e.expires_at).map(|at| {
                let remaining = at.saturating_duration_since(now);
                remaining.as_millis().div_ceil(1000) as u64
            }))
        })
        .await
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        if members.is_empty() {
            return Err(CacheError::General(
                "wrong number of arguments for 'sadd' command".to_string(),
            ));
        }
        self.write_entry(key, |entries| {
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(Data::Set(HashSet::new())));
            let Data::Set(set) = &mut entry.data else {
                return Err(wrong_type(key));
            };
            let added = members
                .iter()
                .filter(|member| set.insert((*member).clone()))
                .count();
            Ok(added as u64)
        })
        .await
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>, CacheError> {
        self.read_entry(key, |entry| match entry.map(|e| &e.data) {
            None => Ok(HashSet::new()),
            Some(Data::Set(set)) => Ok(set.clone()),
            Some(_) => Err(wrong_type(key)),
        })
        .await
    }

    async fn rpush(&self, key: &str, values: &[String]) -> Result<u64, CacheError> {
        if values.is_empty() {
            return Err(CacheError::General(
                "wrong number of arguments for 'rpush' command".to_string(),
            ));
        }
        self.write_entry(key, |entries| {
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(Data::List(VecDeque::new())));
            let Data::List(list) = &mut entry.data else {
                return Err(wrong_type(key));
            };
            list.extend(values.iter().cloned());
            Ok(list.len() as u64)
        })
        .await
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError> {
        self.read_entry(key, |entry| match entry.map(|e| &e.data) {
            None => Ok(Vec::new()),
            Some(Data::List(list)) => Ok(normalize_range(list.len(), start, stop)
                .map(|(from, to)| list.range(from..=to).cloned().collect())
                .unwrap_or_default()),
            Some(_) => Err(wrong_type(key)),
        })
        .await
    }

    async fn llen(&self, key: &str) -> Result<u64, CacheError> {
        self.read_entry(key, |entry| match entry.map(|e| &e.data) {
            None => Ok(0),
            Some(Data::List(list)) => Ok(list.len() as u64),
            Some(_) => Err(wrong_type(key)),
        })
        .await
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.write_entry(key, |entries| {
            let Some(entry) = entries.get_mut(key) else {
                return Ok(None);
            };
            let Data::List(list) = &mut entry.data else {
                return Err(wrong_type(key));
            };
            let popped = list.pop_back();
            // Redis drops a list once its last element is gone
            if list.is_empty() {
                entries.remove(key);
            }
            Ok(popped)
        })
        .await
    }

    async fn ping(&self) -> Result<String, CacheError> {
        self.check_available()?;
        Ok("PONG".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_normalize_range() {
        let cases = [
            ((5, 0, -1), Some((0, 4))),
            ((5, 1, 2), Some((1, 2))),
            ((5, -2, -1), Some((3, 4))),
            ((5, 0, 100), Some((0, 4))),
            ((5, -100, 1), Some((0, 1))),
            ((5, 3, 1), None),
            ((5, 5, 10), None),
            ((5, 0, -6), None),
            ((0, 0, -1), None),
        ];

        for ((len, start, stop), expected) in cases {
            assert_eq!(
                normalize_range(len, start, stop),
                expected,
                "len={} start={} stop={}",
                len,
                start,
                stop
            );
        }
    }

    #[tokio::test]
    async fn test_string_commands() {
        let backend = MemoryBackend::new();

        assert_eq!(backend.get("k").await.unwrap(), None);
        backend.set("k", "v1").await.unwrap();
        backend.set("k", "v2").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some("v2".to_string()));
        assert!(backend.exists("k").await.unwrap());
        assert!(backend.del("k").await.unwrap());
        assert!(!backend.del("k").await.unwrap());
        assert!(!backend.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_incr_by() {
        let backend = MemoryBackend::new();

        assert_eq!(backend.incr_by("n", 1).await.unwrap(), 1);
        assert_eq!(backend.incr_by("n", 5).await.unwrap(), 6);
        assert_eq!(backend.incr_by("n", -10).await.unwrap(), -4);

        backend.set("text", "abc").await.unwrap();
        assert!(matches!(
            backend.incr_by("text", 1).await,
            Err(CacheError::NotAnInteger(_))
        ));

        backend.set("max", &i64::MAX.to_string()).await.unwrap();
        assert!(matches!(
            backend.incr_by("max", 1).await,
            Err(CacheError::NotAnInteger(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let backend = MemoryBackend::new();
        backend.rpush("list", &strings(&["a"])).await.unwrap();

        assert!(matches!(backend.get("list").await, Err(CacheError::WrongType(_))));
        assert!(matches!(
            backend.sadd("list", &strings(&["a"])).await,
            Err(CacheError::WrongType(_))
        ));
        assert!(matches!(backend.smembers("list").await, Err(CacheError::WrongType(_))));

        // SET replaces any kind of value
        backend.set("list", "scalar").await.unwrap();
        assert_eq!(backend.get("list").await.unwrap(), Some("scalar".to_string()));
    }

    #[tokio::test]
    async fn test_set_commands() {
        let backend = MemoryBackend::new();

        assert!(backend.smembers("s").await.unwrap().is_empty());
        assert_eq!(backend.sadd("s", &strings(&["a", "b", "a"])).await.unwrap(), 2);
        assert_eq!(backend.sadd("s", &strings(&["b", "c"])).await.unwrap(), 1);

        let members = backend.smembers("s").await.unwrap();
        assert_eq!(
            members,
            ["a", "b", "c"]
                .iter()
                .map(|m| m.to_string())
                .collect::<HashSet<_>>()
        );

        assert!(backend.sadd("s", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_list_commands() {
        let backend = MemoryBackend::new();

        assert_eq!(backend.rpush("l", &strings(&["a", "b"])).await.unwrap(), 2);
        assert_eq!(backend.rpush("l", &strings(&["c"])).await.unwrap(), 3);
        assert_eq!(backend.lrange("l", 0, -1).await.unwrap(), strings(&["a", "b", "c"]));
        assert_eq!(backend.lrange("l", -2, -1).await.unwrap(), strings(&["b", "c"]));
        assert_eq!(backend.llen("l").await.unwrap(), 3);

        assert_eq!(backend.rpop("l").await.unwrap(), Some("c".to_string()));
        assert_eq!(backend.rpop("l").await.unwrap(), Some("b".to_string()));
        assert_eq!(backend.rpop("l").await.unwrap(), Some("a".to_string()));
        assert_eq!(backend.rpop("l").await.unwrap(), None);
        assert!(!backend.exists("l").await.unwrap());
        assert_eq!(backend.llen("l").await.unwrap(), 0);
        assert!(backend.lrange("missing", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiration() {
        let backend = MemoryBackend::new();

        assert!(!backend.expire("k", 10).await.unwrap());
        backend.set("k", "v").await.unwrap();
        assert_eq!(backend.ttl("k").await.unwrap(), None);

        assert!(backend.expire("k", 10).await.unwrap());
        assert_eq!(backend.ttl("k").await.unwrap(), Some(10));

        // SET keeps the TTL
        backend.set("k", "v2").await.unwrap();
        assert_eq!(backend.ttl("k").await.unwrap(), Some(10));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(backend.ttl("k").await.unwrap(), Some(6));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(!backend.exists("k").await.unwrap());
        assert!(backend.is_empty().await);

        // An expired key starts over on write
        assert_eq!(backend.incr_by("k", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expire_out_of_range() {
        let backend = MemoryBackend::new();
        backend.set("k", "v").await.unwrap();

        assert!(matches!(
            backend.expire("k", i64::MAX as u64).await,
            Err(CacheError::General(_))
        ));
        assert!(matches!(
            backend.expire("k", u64::MAX).await,
            Err(CacheError::General(_))
        ));
        assert_eq!(backend.ttl("k").await.unwrap(), None);
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_failing() {
        let backend = MemoryBackend::new();
        backend.set("k", "v").await.unwrap();

        backend.set_failing(true);
        assert!(matches!(backend.get("k").await, Err(CacheError::Connection(_))));
        assert!(matches!(backend.ping().await, Err(CacheError::Connection(_))));

        backend.set_failing(false);
        assert_eq!(backend.ping().await.unwrap(), "PONG");
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));
    }
}
