//! # nscache
//!
//! Namespaced, fail-soft convenience layer over a Redis-style key-value
//! cache. Scalar values, sets and lists are kept under separate key
//! prefixes (`cb:users:value`, `cb:users:set`, `cb:users:list` by default).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nscache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig {
//!         cache: CacheConfig::new("redis://localhost:6379".to_string(), 5000, 3000),
//!         namespace: NamespaceConfig::new("cb".to_string(), "users".to_string()),
//!     };
//!     let cache = NamespacedCache::from_config(&config)?;
//!
//!     // Fail-soft: returns false and logs when Redis is unreachable
//!     cache.set_value_with_ttl("session:42", "alice", 3600).await;
//!     println!("session: {:?}", cache.get_value("session:42").await);
//!
//!     // Counters propagate errors
//!     let visits = cache.increment("visits").await?;
//!     println!("visits: {}", visits);
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod keys;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::NamespacedCache;
pub use errors::{NsCacheError, NsResult};
pub use keys::{KeyCategory, KeyNamespace, SEPARATOR, build_key};

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, NamespaceConfig};

// Re-export internal crates used in the public API
pub use cache_system;
pub use async_trait;
