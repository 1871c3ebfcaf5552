//! Error types for the nscache crate
//!
//! This module contains all error types that can be returned by the
//! namespaced cache operations that do not swallow failures.

use cache_system::CacheError;
use config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NsCacheError {
    #[error("Cache operation on key [{key}] failed: {source}")]
    Backend {
        key: String,
        #[source]
        source: CacheError,
    },

    #[error("Cache backend error: {0}")]
    Connection(#[from] CacheError),

    #[error("Nothing to write for key [{0}]")]
    EmptyBatch(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl NsCacheError {
    pub(crate) fn backend(key: &str) -> impl FnOnce(CacheError) -> Self + '_ {
        move |source| Self::Backend {
            key: key.to_string(),
            source,
        }
    }
}

pub type NsResult<T> = Result<T, NsCacheError>;
