//! Key Routing Module
//!
//! Decides which peer owns a key. Ownership is a pure function of the key,
//! the peer set and the replica count, so every node computes the same owner
//! without talking to the others.

pub mod hash_ring;

pub use hash_ring::{HashFn, HashRing, blake3_hash};
