use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

/// Future produced by a [`Loader`].
pub type LoadFuture = Pin<Box<dyn Future<Output = anyhow::Result<Vec<u8>>> + Send>>;

/// Produces the value for a key that is not cached yet.
///
/// Errors are handed to the caller of `Group::get` unchanged and are never cached.
pub trait Loader: Send + Sync + 'static {
    fn load(&self, key: String) -> LoadFuture;
}

/// Adapter that turns an async closure into a [`Loader`].
pub struct LoaderFn<F>(F);

/// Wraps `f` so it can be passed wherever a [`Loader`] is expected.
///
/// ```rust,ignore
/// let loader = loader_fn(|key| async move { Ok(key.into_bytes()) });
/// ```
pub fn loader_fn<F, Fut>(f: F) -> LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
{
    LoaderFn(f)
}

impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
{
    fn load(&self, key: String) -> LoadFuture {
        Box::pin((self.0)(key))
    }
}

/// Per-group counters. All fields are monotonically increasing.
#[derive(Debug, Default)]
pub struct GroupStats {
    /// Every `get` with a valid key, including those served to peers.
    pub gets: AtomicU64,
    pub cache_hits: AtomicU64,
    /// Remote fetches that returned a value. Concurrent gets sharing one
    /// fetch count once.
    pub peer_loads: AtomicU64,
    /// Gets whose remote fetch failed or ran past its deadline, and that fell
    /// back to a local load.
    pub peer_errors: AtomicU64,
    /// Cache misses that went through the deduplicator (hits excluded).
    pub loads: AtomicU64,
    /// Loads that actually ran after deduplication.
    pub loads_deduped: AtomicU64,
    /// Loader invocations that succeeded.
    pub local_loads: AtomicU64,
    pub local_load_errs: AtomicU64,
    /// Requests received from peers over the transport.
    pub server_requests: AtomicU64,
}

/// Serializable copy of [`GroupStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStatsSnapshot {
    pub gets: u64,
    pub cache_hits: u64,
    pub peer_loads: u64,
    pub peer_errors: u64,
    pub loads: u64,
    pub loads_deduped: u64,
    pub local_loads: u64,
    pub local_load_errs: u64,
    pub server_requests: u64,
}

impl GroupStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GroupStatsSnapshot {
        GroupStatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            peer_loads: self.peer_loads.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            loads_deduped: self.loads_deduped.load(Ordering::Relaxed),
            local_loads: self.local_loads.load(Ordering::Relaxed),
            local_load_errs: self.local_load_errs.load(Ordering::Relaxed),
            server_requests: self.server_requests.load(Ordering::Relaxed),
        }
    }
}
