//! Cache system for Redis-style key-value backends
//!
//! This crate provides the backend command interface used by the
//! namespaced cache, a Redis implementation and an in-memory one.

pub mod backend;
pub mod errors;
pub mod memory;
pub mod prelude;
pub mod redis_backend;

// Re-export centralized config
pub use config::CacheConfig;

pub use backend::CacheBackend;
pub use errors::CacheError;
pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;
