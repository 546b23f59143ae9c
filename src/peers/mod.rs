//! Peer Transport Module
//!
//! Lets a node ask the owner of a key for its value, and answers such
//! requests for the keys this node owns.
//!
//! ## Core Concepts
//! - **Picking**: `PeerPicker` turns a key into the fetcher for its owner,
//!   or `None` when the key is ours.
//! - **Fetching**: `PeerFetcher` is the transport-agnostic client capability;
//!   `HttpFetcher` implements it over HTTP, tests use in-process fakes.
//! - **Serving**: the axum router in `handlers` resolves the group by name and
//!   answers from its local-only get path, so requests never loop.
//!
//! ## Submodules
//! - **`types`**: the `PeerPicker` / `PeerFetcher` traits.
//! - **`protocol`**: request path layout and the binary response envelope.
//! - **`client`**: `HttpFetcher`.
//! - **`pool`**: `HttpPool`, the ring-backed picker.
//! - **`handlers`**: the server side.

pub mod client;
pub mod handlers;
pub mod pool;
pub mod protocol;
pub mod types;

pub use client::HttpFetcher;
pub use pool::HttpPool;
pub use types::{BoxFuture, PeerFetcher, PeerPicker};
