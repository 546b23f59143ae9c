//! Configuration
//!
//! Default tuning values for groups and the HTTP peer pool. Everything here is
//! plain data with `Default` impls, so hosts can build it in code or
//! deserialize it from whatever config source they already use.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// URL prefix under which peers serve cache requests.
pub const DEFAULT_BASE_PATH: &str = "/_distcache/";
/// Virtual nodes per peer on the hash ring.
pub const DEFAULT_REPLICAS: usize = 50;
/// Upper bound for a single peer fetch, connection included.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(500);
/// Cache budget used by the demo binary: 2 KiB.
pub const DEFAULT_CACHE_BYTES: u64 = 2 << 10;

/// Settings for a single cache group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Namespace the group is registered under.
    pub name: String,
    /// Byte budget of the local cache. `0` disables eviction.
    pub cache_bytes: u64,
}

impl CacheConfig {
    pub fn new(name: impl Into<String>, cache_bytes: u64) -> Self {
        Self {
            name: name.into(),
            cache_bytes,
        }
    }
}

/// Settings for [`crate::peers::pool::HttpPool`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolOptions {
    /// Path prefix for peer requests, must start and end with `/`.
    pub base_path: String,
    /// Virtual nodes per peer.
    pub replicas: usize,
    /// Timeout applied to every outbound fetch.
    #[serde(with = "duration_ms")]
    pub fetch_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl PoolOptions {
    /// Returns the base path normalized to `/prefix/`.
    pub fn normalized_base_path(&self) -> String {
        let cleaned = self.base_path.trim_matches('/');
        if cleaned.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", cleaned)
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
