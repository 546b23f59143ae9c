//! Cache Group
//!
//! A `Group` is one cache namespace: a loader, a local cache, and optionally a
//! peer picker that knows which process owns which key.
//!
//! ## Get Flow
//! ```text
//!   get(key)
//!     ├─ key empty ─────────────────────────────► InvalidArgument
//!     ├─ local cache hit ───────────────────────► value
//!     ├─ remote owner? ── fetch ok ─► populate ─► value
//!     │                  └ fetch failed ┐
//!     └─ local load (deduplicated) ◄───┘ ─► populate ─► value | LoadFailed
//! ```

use super::types::{GroupStats, GroupStatsSnapshot, Loader};
use crate::cache::{ByteView, CacheStats, ConcurrentCache};
use crate::error::{CacheError, FetchError, Result};
use crate::peers::types::{PeerFetcher, PeerPicker};
use crate::singleflight::Deduplicator;

use std::sync::{Arc, OnceLock};
use tokio::time::Instant;

pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    cache: Arc<ConcurrentCache>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    /// Local loads, shared with the peer server path.
    flight: Deduplicator,
    /// Remote fetches. Kept apart from `flight` so a peer request served by
    /// `get_locally` never waits on one of our own outbound fetches.
    fetches: Deduplicator,
    stats: Arc<GroupStats>,
}

impl Group {
    /// Creates a group outside of any registry. Most hosts should go through
    /// `GroupRegistry::create_group` so the peer server can find it.
    pub fn new(name: &str, cache_bytes: u64, loader: impl Loader) -> Result<Self> {
        if name.is_empty() {
            return Err(CacheError::Misconfiguration(
                "group name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            loader: Arc::new(loader),
            cache: Arc::new(ConcurrentCache::new(cache_bytes)),
            peers: OnceLock::new(),
            flight: Deduplicator::new(),
            fetches: Deduplicator::new(),
            stats: Arc::new(GroupStats::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches the peer picker. Allowed once per group.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) -> Result<()> {
        self.peers.set(picker).map_err(|_| {
            CacheError::Misconfiguration(format!(
                "peers already registered for group {}",
                self.name
            ))
        })
    }

    /// Returns the value for `key`, from the local cache, its remote owner, or
    /// the loader, in that order.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        self.get_inner(key, None).await
    }

    /// Like [`Group::get`], but gives up on the remote owner once `deadline`
    /// passes and loads locally instead. A local load already in flight is
    /// never cut short.
    pub async fn get_with_deadline(&self, key: &str, deadline: Instant) -> Result<ByteView> {
        self.get_inner(key, Some(deadline)).await
    }

    /// Cache check plus local load. Never consults peers, so a peer serving a
    /// request through this path cannot bounce it elsewhere.
    pub async fn get_locally(&self, key: &str) -> Result<ByteView> {
        validate_key(key)?;
        GroupStats::incr(&self.stats.gets);

        if let Some(value) = self.lookup_cache(key) {
            return Ok(value);
        }
        self.load_locally(key).await
    }

    async fn get_inner(&self, key: &str, deadline: Option<Instant>) -> Result<ByteView> {
        validate_key(key)?;
        GroupStats::incr(&self.stats.gets);

        if let Some(value) = self.lookup_cache(key) {
            return Ok(value);
        }

        if let Some(peer) = self.peers.get().and_then(|picker| picker.pick_peer(key)) {
            let peer_addr = peer.peer().to_string();
            match self.fetch_from_peer(peer, key, deadline).await {
                Ok(value) => return Ok(value),
                Err(CacheError::Remote(FetchError::Rejected(reason))) => {
                    tracing::debug!(
                        "[Group {}] owner {} could not load {}: {}",
                        self.name,
                        peer_addr,
                        key,
                        reason
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "[Group {}] failed to get {} from {}: {}",
                        self.name,
                        key,
                        peer_addr,
                        e
                    );
                }
            }
        }

        self.load_locally(key).await
    }

    fn lookup_cache(&self, key: &str) -> Option<ByteView> {
        let value = self.cache.get(key)?;
        GroupStats::incr(&self.stats.cache_hits);
        tracing::debug!("[Group {}] hit {}", self.name, key);
        Some(value)
    }

    /// Asks the remote owner for `key`. Concurrent callers share one request;
    /// `deadline` only bounds how long this caller waits for it.
    async fn fetch_from_peer(
        &self,
        peer: Arc<dyn PeerFetcher>,
        key: &str,
        deadline: Option<Instant>,
    ) -> Result<ByteView> {
        let peer_addr = peer.peer().to_string();
        let cache = self.cache.clone();
        let stats = self.stats.clone();
        let group = self.name.clone();
        let owned_key = key.to_string();

        let shared = self.fetches.run(key, move || async move {
            if let Some(value) = cache.get(&owned_key) {
                GroupStats::incr(&stats.cache_hits);
                return Ok(value);
            }
            let value = match peer.fetch(&group, &owned_key).await {
                Ok(value) => value,
                Err(e) => return Err(CacheError::Remote(e)),
            };
            GroupStats::incr(&stats.peer_loads);
            cache.add(&owned_key, value.clone());
            Ok(value)
        });

        let result = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, shared).await.unwrap_or_else(|_| {
                Err(FetchError::Unavailable(format!("deadline exceeded asking {}", peer_addr)).into())
            }),
            None => shared.await,
        };
        if result.is_err() {
            GroupStats::incr(&self.stats.peer_errors);
        }
        result
    }

    async fn load_locally(&self, key: &str) -> Result<ByteView> {
        GroupStats::incr(&self.stats.loads);

        let loader = self.loader.clone();
        let cache = self.cache.clone();
        let stats = self.stats.clone();
        let name = self.name.clone();
        let owned_key = key.to_string();

        self.flight
            .run(key, move || async move {
                // A burst that finished just before we got here may have filled the cache.
                if let Some(value) = cache.get(&owned_key) {
                    GroupStats::incr(&stats.cache_hits);
                    return Ok(value);
                }

                GroupStats::incr(&stats.loads_deduped);
                tracing::info!("[Group {}] loading {}", name, owned_key);

                match loader.load(owned_key.clone()).await {
                    Ok(bytes) => {
                        GroupStats::incr(&stats.local_loads);
                        let value = ByteView::from(bytes);
                        cache.add(&owned_key, value.clone());
                        Ok(value)
                    }
                    Err(e) => {
                        GroupStats::incr(&stats.local_load_errs);
                        tracing::debug!("[Group {}] loader failed for {}: {}", name, owned_key, e);
                        Err(CacheError::load_failed(e))
                    }
                }
            })
            .await
    }

    pub fn stats(&self) -> GroupStatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn record_server_request(&self) {
        GroupStats::incr(&self.stats.server_requests);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("peers_registered", &self.peers.get().is_some())
            .field("cache", &self.cache.stats())
            .finish()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidArgument("key is required".to_string()));
    }
    Ok(())
}
