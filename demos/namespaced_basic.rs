//! Basic namespaced cache usage
//!
//! Connects to the Redis configured in `nscache.toml` (or `NSCACHE_CONFIG`),
//! falling back to `redis://localhost:6379`, and walks through scalar,
//! counter, set and list operations.
//!
//! ```sh
//! RUST_LOG=info cargo run --example namespaced_basic
//! ```

use std::collections::HashSet;

use nscache::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "no configuration file, using defaults");
        AppConfig::default()
    });
    let cache = NamespacedCache::from_config(&config)?;

    let pong = cache.ping().await?;
    tracing::info!(%pong, namespace = ?cache.namespace(), "connected");

    // Scalar values
    cache.set_value_with_ttl("session:42", "alice", 600).await;
    tracing::info!(
        value = ?cache.get_value("session:42").await,
        ttl = ?cache.key_ttl(KeyCategory::Value, "session:42").await,
        "session"
    );

    // Counters
    let visits = cache.increment("visits").await?;
    let points = cache.increment_by("points", 10).await?;
    tracing::info!(visits, points, "counters");

    // Sets
    let roles: HashSet<String> = ["admin", "editor"].iter().map(|r| r.to_string()).collect();
    cache.add_all_to_set("roles:42", &roles).await;
    cache.add_to_set("roles:42", "viewer").await;
    tracing::info!(roles = ?cache.get_set("roles:42").await, "roles");

    // Lists
    cache.push_all_to_list("audit:42", &["login", "view", "logout"]).await;
    cache.pop_from_list("audit:42").await;
    tracing::info!(
        entries = ?cache.get_list_range("audit:42", 0, -1).await,
        size = cache.get_list_size("audit:42").await,
        "audit trail"
    );

    for category in KeyCategory::ALL {
        let removed = match category {
            KeyCategory::Value => cache.remove_value("session:42").await,
            KeyCategory::Set => cache.remove_set("roles:42").await,
            KeyCategory::List => cache.remove_list("audit:42").await,
        };
        tracing::info!(%category, removed, "cleanup");
    }

    Ok(())
}
