//! Error types for cache operations
//!
//! This module defines all error types that can occur
//! during backend commands and Redis interactions.

use thiserror::Error;

/// Cache system errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    ConnectionError(#[from] redis::RedisError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("WRONGTYPE operation against key holding the wrong kind of value: {0}")]
    WrongType(String),

    #[error("Value is not an integer or out of range: {0}")]
    NotAnInteger(String),

    #[error("Cache operation timeout")]
    Timeout,

    #[error("General cache error: {0}")]
    General(String),
}
