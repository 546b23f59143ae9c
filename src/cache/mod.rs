//! Local Cache Module
//!
//! The in-memory storage every group keeps for the keys it has seen.
//!
//! ## Components
//! - **`byteview`**: `ByteView`, the immutable unit of cached value.
//! - **`lru`**: `LruStore`, a single-owner LRU store bounded by a byte budget.
//! - **`concurrent`**: `ConcurrentCache`, a mutex-guarded `LruStore` shared
//!   between request tasks.

pub mod byteview;
pub mod concurrent;
pub mod lru;

pub use byteview::ByteView;
pub use concurrent::{CacheStats, ConcurrentCache};
pub use lru::LruStore;
