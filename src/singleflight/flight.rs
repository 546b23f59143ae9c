//! Request Deduplicator
//!
//! Collapses concurrent loads of the same key into one execution. The first
//! caller of a burst (the leader) spawns the work onto the runtime; every
//! caller, leader included, then waits on a `watch` channel for the outcome.
//!
//! ```text
//!   caller A ──┐
//!   caller B ──┼──► calls["Tom"] ──► one spawned load ──► Some(result) ──► A, B, C
//!   caller C ──┘
//! ```
//!
//! Running the work in its own task means a caller that gives up (its future
//! is dropped) cannot cancel a load other callers are waiting on.

use crate::cache::ByteView;
use crate::error::CacheError;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

type Outcome = Option<Result<ByteView, CacheError>>;

/// Removes the in-flight record when the load finishes, even if it panicked.
struct FlightGuard {
    calls: Arc<DashMap<String, watch::Receiver<Outcome>>>,
    key: String,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.calls.remove(&self.key);
    }
}

#[derive(Default)]
pub struct Deduplicator {
    calls: Arc<DashMap<String, watch::Receiver<Outcome>>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `load` for `key` unless a load for `key` is already in flight, in
    /// which case the caller waits for and shares that result instead.
    ///
    /// Errors are delivered to every waiter and are not remembered: once the
    /// record is gone, the next call starts a fresh load.
    pub async fn run<F, Fut>(&self, key: &str, load: F) -> Result<ByteView, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ByteView, CacheError>> + Send + 'static,
    {
        let (mut rx, started) = {
            match self.calls.entry(key.to_string()) {
                Entry::Occupied(entry) => (entry.get().clone(), None),
                Entry::Vacant(entry) => {
                    let (tx, rx) = watch::channel(None);
                    entry.insert(rx.clone());
                    (rx, Some(tx))
                }
            }
        };

        if let Some(tx) = started {
            let guard = FlightGuard {
                calls: self.calls.clone(),
                key: key.to_string(),
            };
            let work = load();
            tokio::spawn(async move {
                let result = work.await;
                // Forget the record before publishing so late arrivals start a new load.
                drop(guard);
                let _ = tx.send(Some(result));
            });
        } else {
            tracing::debug!("Joining in-flight load for key {}", key);
        }

        match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => match &*outcome {
                Some(result) => result.clone(),
                None => Err(abandoned(key)),
            },
            Err(_) => Err(abandoned(key)),
        }
    }

    /// Number of keys with a load currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.len()
    }
}

fn abandoned(key: &str) -> CacheError {
    tracing::error!("Load for key {} ended without a result", key);
    CacheError::load_failed(anyhow::anyhow!("load for key {} aborted", key))
}
