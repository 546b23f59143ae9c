//! Single-Flight Module
//!
//! Protects loaders from thundering herds: at most one load per key is in
//! flight at a time, and everyone asking during that window shares its result.

pub mod flight;

pub use flight::Deduplicator;
