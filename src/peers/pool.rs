//! HTTP Peer Pool
//!
//! `HttpPool` is this process's view of the cluster: it knows its own address,
//! keeps the hash ring of all peers, and holds one [`HttpFetcher`] per remote
//! peer. Membership changes rebuild the ring wholesale under a write lock;
//! lookups take the read lock for the duration of one ring query.

use super::client::HttpFetcher;
use super::types::{PeerFetcher, PeerPicker};
use crate::config::PoolOptions;
use crate::error::{CacheError, Result};
use crate::ring::HashRing;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct PoolState {
    ring: HashRing,
    fetchers: HashMap<String, Arc<HttpFetcher>>,
}

pub struct HttpPool {
    self_addr: String,
    base_path: String,
    options: PoolOptions,
    state: RwLock<PoolState>,
    http_client: reqwest::Client,
}

impl HttpPool {
    /// `self_addr` must be spelled exactly as it appears in the peer list,
    /// e.g. `http://localhost:8001`.
    pub fn new(self_addr: &str, options: PoolOptions) -> Result<Arc<Self>> {
        if options.replicas == 0 {
            return Err(CacheError::Misconfiguration(
                "peer pool needs at least one replica per peer".to_string(),
            ));
        }
        let base_path = options.normalized_base_path();

        Ok(Arc::new(Self {
            self_addr: self_addr.trim_end_matches('/').to_string(),
            base_path,
            state: RwLock::new(PoolState {
                ring: HashRing::new(options.replicas),
                fetchers: HashMap::new(),
            }),
            options,
            http_client: reqwest::Client::new(),
        }))
    }

    /// Replaces the peer set. The list may include this process's own address.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let peers: Vec<String> = peers
            .into_iter()
            .map(|p| p.as_ref().trim_end_matches('/').to_string())
            .collect();

        let mut ring = HashRing::new(self.options.replicas);
        ring.add(&peers);

        let fetchers = peers
            .iter()
            .map(|peer| {
                let fetcher = HttpFetcher::new(
                    peer,
                    &self.base_path,
                    self.options.fetch_timeout,
                    self.http_client.clone(),
                );
                (peer.clone(), Arc::new(fetcher))
            })
            .collect();

        *self.state.write() = PoolState { ring, fetchers };
        tracing::info!("Peer pool {} now has {} peer(s)", self.self_addr, peers.len());
    }

    pub fn peers(&self) -> Vec<String> {
        self.state.read().ring.peers().to_vec()
    }

    /// Owner of `key` according to the current ring, possibly ourselves.
    pub fn owner_of(&self, key: &str) -> Option<String> {
        self.state.read().ring.get(key).map(str::to_string)
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>> {
        let state = self.state.read();
        let peer = state.ring.get(key)?;
        if peer == self.self_addr {
            return None;
        }
        tracing::debug!("[Pool {}] key {} owned by {}", self.self_addr, key, peer);
        state
            .fetchers
            .get(peer)
            .map(|fetcher| fetcher.clone() as Arc<dyn PeerFetcher>)
    }
}
