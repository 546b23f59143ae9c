//! Cache Group Tests
//!
//! Exercises the get-or-load state machine without a network: peers are
//! simulated with in-process fetchers that call straight into another group.
//!
//! ## Test Scopes
//! - **Local path**: hits, loads, validation, loader errors.
//! - **Deduplication**: concurrent misses for one key.
//! - **Remote path**: delegation, population, fallback, deadlines.
//! - **Registry**: creation, lookup, teardown, misuse.

#[cfg(test)]
mod tests {
    use crate::cache::ByteView;
    use crate::error::{CacheError, FetchError};
    use crate::group::{Group, GroupRegistry, Loader, loader_fn};
    use crate::peers::types::{BoxFuture, PeerFetcher, PeerPicker};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn scores_db() -> HashMap<String, String> {
        [("Tom", "630"), ("Jack", "589"), ("Sam", "567")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Loader over the scores table that counts its invocations.
    fn counting_loader(calls: Arc<AtomicUsize>) -> impl Loader {
        let db = Arc::new(scores_db());
        loader_fn(move |key: String| {
            let db = db.clone();
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                db.get(&key)
                    .map(|v| v.clone().into_bytes())
                    .ok_or_else(|| anyhow::anyhow!("{} not exist", key))
            }
        })
    }

    /// Fetcher that serves requests from another in-process group.
    struct LocalGroupFetcher {
        peer: String,
        owner: Arc<Group>,
        fetches: AtomicUsize,
    }

    impl PeerFetcher for LocalGroupFetcher {
        fn peer(&self) -> &str {
            &self.peer
        }

        fn fetch<'a>(&'a self, _group: &'a str, key: &'a str) -> BoxFuture<'a, Result<ByteView, FetchError>> {
            Box::pin(async move {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                self.owner
                    .get_locally(key)
                    .await
                    .map_err(|e| FetchError::Rejected(e.to_string()))
            })
        }
    }

    /// Fetcher that always fails after `delay`.
    struct BrokenFetcher {
        delay: Duration,
    }

    impl PeerFetcher for BrokenFetcher {
        fn peer(&self) -> &str {
            "http://unreachable:1"
        }

        fn fetch<'a>(&'a self, _group: &'a str, _key: &'a str) -> BoxFuture<'a, Result<ByteView, FetchError>> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                Err(FetchError::Unavailable("connection refused".to_string()))
            })
        }
    }

    /// Fetcher that answers after `delay`, counting how often it is asked.
    struct SlowFetcher {
        delay: Duration,
        fail: bool,
        fetches: AtomicUsize,
    }

    impl PeerFetcher for SlowFetcher {
        fn peer(&self) -> &str {
            "http://peer-slow"
        }

        fn fetch<'a>(&'a self, _group: &'a str, key: &'a str) -> BoxFuture<'a, Result<ByteView, FetchError>> {
            Box::pin(async move {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                if self.fail {
                    return Err(FetchError::Unavailable("connection reset".to_string()));
                }
                Ok(ByteView::from(format!("remote-{}", key).as_str()))
            })
        }
    }

    /// Routes every key to the same fetcher.
    struct FixedPicker(Option<Arc<dyn PeerFetcher>>);

    impl PeerPicker for FixedPicker {
        fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerFetcher>> {
            self.0.clone()
        }
    }

    // ============================================================
    // LOCAL PATH
    // ============================================================

    #[tokio::test]
    async fn test_get_loads_once_then_hits_cache() {
        let registry = GroupRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let group = registry
            .create_group("scores", 2 << 10, counting_loader(calls.clone()))
            .unwrap();

        for _ in 0..2 {
            let value = group.get("Tom").await.unwrap();
            assert_eq!(value.to_string(), "630");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1, "second get should be a cache hit");
        let stats = group.stats();
        assert_eq!(stats.gets, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.local_loads, 1);
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected_before_loading() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Group::new("scores", 0, counting_loader(calls.clone())).unwrap();

        let err = group.get("").await.unwrap_err();

        assert!(err.is_invalid_argument());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(group.cache_stats().misses, 0, "cache must not be touched");
    }

    #[tokio::test]
    async fn test_loader_error_is_verbatim_and_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Group::new("scores", 0, counting_loader(calls.clone())).unwrap();

        for _ in 0..2 {
            let err = group.get("kkk").await.unwrap_err();
            assert!(matches!(err, CacheError::LoadFailed(_)));
            assert_eq!(err.to_string(), "kkk not exist");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(group.stats().local_load_errs, 2);
        assert_eq!(group.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_small_budget_evicts_old_keys() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Group::new("scores", 30, counting_loader(calls.clone())).unwrap();

        group.get("Tom").await.unwrap();
        group.get("Jack").await.unwrap();
        group.get("Tom").await.unwrap();

        let cache = group.cache_stats();
        assert!(cache.bytes <= 30);
        assert!(cache.evictions >= 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_gets_invoke_loader_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slow_calls = calls.clone();
        let group = Arc::new(
            Group::new(
                "slow",
                0,
                loader_fn(move |key: String| {
                    let calls = slow_calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(format!("value-of-{}", key).into_bytes())
                    }
                }),
            )
            .unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..16 {
            let group = group.clone();
            handles.push(tokio::spawn(async move { group.get("Tom").await }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().to_string(), "value-of-Tom");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(group.stats().loads_deduped, 1);
    }

    #[tokio::test]
    async fn test_same_key_in_different_groups_does_not_collide() {
        let registry = GroupRegistry::new();
        let a = registry
            .create_group("a", 0, loader_fn(|_key: String| async { Ok(b"from-a".to_vec()) }))
            .unwrap();
        let b = registry
            .create_group("b", 0, loader_fn(|_key: String| async { Ok(b"from-b".to_vec()) }))
            .unwrap();

        let (va, vb) = tokio::join!(a.get("Tom"), b.get("Tom"));

        assert_eq!(va.unwrap().to_string(), "from-a");
        assert_eq!(vb.unwrap().to_string(), "from-b");
    }

    // ============================================================
    // REMOTE PATH
    // ============================================================

    #[tokio::test]
    async fn test_remote_owner_value_is_cached_locally() {
        let owner_calls = Arc::new(AtomicUsize::new(0));
        let owner = Arc::new(Group::new("scores", 0, counting_loader(owner_calls.clone())).unwrap());

        let local_calls = Arc::new(AtomicUsize::new(0));
        let local = Group::new("scores", 0, counting_loader(local_calls.clone())).unwrap();

        let fetcher = Arc::new(LocalGroupFetcher {
            peer: "http://peer-b".to_string(),
            owner: owner.clone(),
            fetches: AtomicUsize::new(0),
        });
        local
            .register_peers(Arc::new(FixedPicker(Some(fetcher.clone()))))
            .unwrap();

        assert_eq!(local.get("Tom").await.unwrap().to_string(), "630");
        assert_eq!(local.get("Tom").await.unwrap().to_string(), "630");

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1, "second get must stay local");
        assert_eq!(owner_calls.load(Ordering::SeqCst), 1);
        assert_eq!(local_calls.load(Ordering::SeqCst), 0);
        assert_eq!(local.stats().peer_loads, 1);
        assert_eq!(local.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_local_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Group::new("scores", 0, counting_loader(calls.clone())).unwrap();
        group
            .register_peers(Arc::new(FixedPicker(Some(Arc::new(BrokenFetcher {
                delay: Duration::ZERO,
            })))))
            .unwrap();

        let value = group.get("Jack").await.unwrap();

        assert_eq!(value.to_string(), "589");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(group.stats().peer_errors, 1);
    }

    #[tokio::test]
    async fn test_remote_rejection_falls_back_and_reports_loader_error() {
        let owner = Arc::new(Group::new("scores", 0, counting_loader(Arc::new(AtomicUsize::new(0)))).unwrap());
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Group::new("scores", 0, counting_loader(calls.clone())).unwrap();
        group
            .register_peers(Arc::new(FixedPicker(Some(Arc::new(LocalGroupFetcher {
                peer: "http://peer-b".to_string(),
                owner,
                fetches: AtomicUsize::new(0),
            })))))
            .unwrap();

        let err = group.get("nobody").await.unwrap_err();

        assert_eq!(err.to_string(), "nobody not exist");
        assert_eq!(calls.load(Ordering::SeqCst), 1, "fallback runs the local loader exactly once");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_gets_share_one_remote_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Arc::new(Group::new("scores", 0, counting_loader(calls.clone())).unwrap());
        let fetcher = Arc::new(SlowFetcher {
            delay: Duration::from_millis(100),
            fail: false,
            fetches: AtomicUsize::new(0),
        });
        group
            .register_peers(Arc::new(FixedPicker(Some(fetcher.clone()))))
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let group = group.clone();
            handles.push(tokio::spawn(async move { group.get("Tom").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().to_string(), "remote-Tom");
        }

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(group.stats().peer_loads, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_remote_failure_falls_back_to_one_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Arc::new(Group::new("scores", 0, counting_loader(calls.clone())).unwrap());
        let fetcher = Arc::new(SlowFetcher {
            delay: Duration::from_millis(100),
            fail: true,
            fetches: AtomicUsize::new(0),
        });
        group
            .register_peers(Arc::new(FixedPicker(Some(fetcher.clone()))))
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let group = group.clone();
            handles.push(tokio::spawn(async move { group.get("Jack").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().to_string(), "589");
        }

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(group.stats().peer_errors, 8, "every waiter falls back");
    }

    #[tokio::test]
    async fn test_deadline_bounds_remote_fetch_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Group::new("scores", 0, counting_loader(calls.clone())).unwrap();
        group
            .register_peers(Arc::new(FixedPicker(Some(Arc::new(BrokenFetcher {
                delay: Duration::from_secs(5),
            })))))
            .unwrap();

        let started = std::time::Instant::now();
        let deadline = tokio::time::Instant::now() + Duration::from_millis(50);
        let value = group.get_with_deadline("Sam", deadline).await.unwrap();

        assert_eq!(value.to_string(), "567");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(group.stats().peer_errors, 1);
    }

    #[tokio::test]
    async fn test_picker_returning_self_loads_locally() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Group::new("scores", 0, counting_loader(calls.clone())).unwrap();
        group.register_peers(Arc::new(FixedPicker(None))).unwrap();

        assert_eq!(group.get("Tom").await.unwrap().to_string(), "630");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(group.stats().peer_loads, 0);
    }

    #[tokio::test]
    async fn test_register_peers_twice_is_misconfiguration() {
        let group = Group::new("scores", 0, counting_loader(Arc::new(AtomicUsize::new(0)))).unwrap();

        assert!(group.register_peers(Arc::new(FixedPicker(None))).is_ok());
        let err = group.register_peers(Arc::new(FixedPicker(None))).unwrap_err();
        assert!(err.is_misconfiguration());
    }

    #[test]
    fn test_remote_errors_convert_into_cache_error() {
        let err: CacheError = FetchError::Rejected("Tom not exist".to_string()).into();

        assert!(matches!(err, CacheError::Remote(FetchError::Rejected(_))));
        assert_eq!(err.to_string(), "peer rejected key: Tom not exist");
    }

    #[test]
    fn test_group_debug_shows_name_and_cache() {
        let group = Group::new("scores", 0, counting_loader(Arc::new(AtomicUsize::new(0)))).unwrap();

        let debug = format!("{:?}", group);

        assert!(debug.contains("scores"), "got {}", debug);
        assert!(debug.contains("peers_registered: false"), "got {}", debug);
    }

    // ============================================================
    // REGISTRY
    // ============================================================

    #[test]
    fn test_registry_lookup_and_teardown() {
        let registry = GroupRegistry::new();
        assert!(registry.is_empty());

        registry
            .create_group("scores", 0, counting_loader(Arc::new(AtomicUsize::new(0))))
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["scores".to_string()]);
        assert_eq!(registry.get("scores").unwrap().name(), "scores");
        assert!(registry.get("missing").is_none());
        assert!(matches!(
            registry.require("missing"),
            Err(CacheError::GroupNotFound(_))
        ));

        assert!(registry.remove("scores").is_some());
        assert!(registry.remove("scores").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_rejects_duplicates_and_empty_names() {
        let registry = GroupRegistry::new();
        registry
            .create_group("scores", 0, counting_loader(Arc::new(AtomicUsize::new(0))))
            .unwrap();

        let duplicate = registry
            .create_group("scores", 0, counting_loader(Arc::new(AtomicUsize::new(0))))
            .unwrap_err();
        assert!(duplicate.is_misconfiguration());

        let empty = registry
            .create_group("", 0, counting_loader(Arc::new(AtomicUsize::new(0))))
            .unwrap_err();
        assert!(empty.is_misconfiguration());
        assert_eq!(registry.len(), 1);
    }
}
