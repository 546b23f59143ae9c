//! Cache Group Module
//!
//! The orchestration layer that ties the local cache, the deduplicator and the
//! peer transport together.
//!
//! ## Submodules
//! - **`group`**: `Group` and its get-or-load state machine.
//! - **`registry`**: `GroupRegistry`, the name -> group table used by the peer server.
//! - **`types`**: the `Loader` capability, its closure adapter, and group counters.

pub mod group;
pub mod registry;
pub mod types;

pub use group::Group;
pub use registry::GroupRegistry;
pub use types::{GroupStats, GroupStatsSnapshot, LoadFuture, Loader, LoaderFn, loader_fn};

#[cfg(test)]
mod tests;
