use std::env;
use std::time::Duration;

use tracing::warn;
use typed_builder::TypedBuilder;

/// Engine configuration. Every knob has a default so the library is
/// constructible without any environment.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SyncConfig {
    /// Fixed delay between the end of one poll tick and the start of the next.
    #[builder(default = Duration::from_millis(3000))]
    pub poll_interval: Duration,

    /// Page size used when a session is created without an explicit limit.
    #[builder(default = 50)]
    pub default_page_limit: u32,

    /// Bound on the snapshot memoization cache (FIFO eviction past this).
    #[builder(default = 50)]
    pub snapshot_cache_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig::builder().build()
    }
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything missing or unparseable.
    pub fn from_env() -> Self {
        SyncConfig::builder()
            .poll_interval(Duration::from_millis(env_or(
                "CREATORSCOPE_POLL_INTERVAL_MS",
                3000,
            )))
            .default_page_limit(env_or("CREATORSCOPE_PAGE_LIMIT", 50))
            .snapshot_cache_capacity(env_or("CREATORSCOPE_SNAPSHOT_CACHE_CAPACITY", 50))
            .build()
    }
}

fn env_or<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = raw.as_str(), "Unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}
