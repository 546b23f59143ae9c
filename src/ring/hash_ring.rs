//! Consistent Hash Ring
//!
//! Maps keys to peers so that adding or removing one peer only moves the keys
//! that fall between that peer's virtual nodes and their ring neighbours.
//!
//! Each peer is placed `replicas` times on a 32-bit ring, at
//! `hash("{index}{peer}")` for `index in 0..replicas`. A key belongs to the
//! first virtual node clockwise from `hash(key)`.

use std::collections::HashMap;

/// Hash used to place keys and virtual nodes on the ring.
pub type HashFn = fn(&[u8]) -> u32;

/// First four bytes of the BLAKE3 digest, little endian. Stable across
/// processes, builds and platforms.
pub fn blake3_hash(data: &[u8]) -> u32 {
    let digest = blake3::hash(data);
    let bytes = digest.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[derive(Clone)]
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Virtual node positions, strictly increasing.
    keys: Vec<u32>,
    hash_map: HashMap<u32, String>,
    peers: Vec<String>,
}

impl HashRing {
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, blake3_hash)
    }

    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            hash,
            replicas,
            keys: Vec::new(),
            hash_map: HashMap::new(),
            peers: Vec::new(),
        }
    }

    /// Adds peers to the ring. Peers already present are ignored.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            if self.peers.iter().any(|p| p == peer) {
                continue;
            }
            self.peers.push(peer.to_string());
        }
        self.rebuild();
    }

    /// Replaces the whole membership.
    pub fn set<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.peers.clear();
        self.add(peers);
    }

    /// Removes a peer. Returns `false` if it was not on the ring.
    pub fn remove(&mut self, peer: &str) -> bool {
        let before = self.peers.len();
        self.peers.retain(|p| p != peer);
        if self.peers.len() == before {
            return false;
        }
        self.rebuild();
        true
    }

    /// Returns the peer owning `key`, or `None` when the ring is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.keys.partition_point(|&k| k < hash);
        // Past the last virtual node: wrap around to the first one.
        let slot = self.keys[idx % self.keys.len()];
        self.hash_map.get(&slot).map(String::as_str)
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Number of physical peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    fn rebuild(&mut self) {
        self.keys.clear();
        self.hash_map.clear();

        for peer in &self.peers {
            for i in 0..self.replicas {
                let hash = (self.hash)(format!("{}{}", i, peer).as_bytes());
                // Collision: the smaller identity wins, whatever the insertion order.
                let keep_existing = self
                    .hash_map
                    .get(&hash)
                    .is_some_and(|existing| existing.as_str() <= peer.as_str());
                if !keep_existing {
                    self.hash_map.insert(hash, peer.clone());
                }
            }
        }

        self.keys = self.hash_map.keys().copied().collect();
        self.keys.sort_unstable();
    }
}

impl std::fmt::Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("peers", &self.peers)
            .field("virtual_nodes", &self.keys.len())
            .finish()
    }
}
