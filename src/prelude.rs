//! Convenience re-exports for common nscache usage
//!
//! # Example
//!
//! ```rust
//! use nscache::prelude::*;
//!
//! let cache = NamespacedCache::new(std::sync::Arc::new(MemoryBackend::new()));
//! assert_eq!(cache.key_for(KeyCategory::Value, &["token"]), "cb:users:value:token");
//! ```

// Core components
pub use crate::core::NamespacedCache;
pub use crate::errors::{NsCacheError, NsResult};
pub use crate::keys::{KeyCategory, KeyNamespace, build_key};

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, ConfigError, NamespaceConfig};

// Re-export cache system
pub use cache_system::prelude::*;
