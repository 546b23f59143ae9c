//! Distributed Memoizing Cache Library
//!
//! A set of peer processes that jointly cache the results of an expensive
//! loader. Each key has exactly one owner, chosen by consistent hashing; any
//! node can be asked for any key and will serve it from memory, from the
//! owner, or by running the loader once.
//!
//! ## Architecture Modules
//!
//! - **`cache`**: `ByteView` values and the byte-budgeted, thread-safe LRU cache.
//! - **`singleflight`**: Collapses concurrent loads of the same key into one.
//! - **`ring`**: The consistent hash ring that assigns keys to peers.
//! - **`peers`**: Peer picking, the HTTP client and the axum server endpoint.
//! - **`group`**: Cache groups, their get-or-load flow, and the group registry.
//! - **`config`** / **`error`**: Defaults and the library error types.

pub mod cache;
pub mod config;
pub mod error;
pub mod group;
pub mod peers;
pub mod ring;
pub mod singleflight;

pub use cache::ByteView;
pub use error::{CacheError, FetchError};
pub use group::{Group, GroupRegistry, Loader, loader_fn};
pub use peers::{HttpPool, PeerFetcher, PeerPicker};
