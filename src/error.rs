//! Error Types
//!
//! The library surface reports failures through [`CacheError`]. Loader
//! implementations return `anyhow::Result`, and their errors are carried through
//! unchanged so callers see the loader's own message.

use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a peer transport when asking a remote owner for a key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The peer could not be reached or answered with something we cannot use:
    /// timeout, refused connection, malformed envelope, unknown group.
    #[error("peer unavailable: {0}")]
    Unavailable(String),

    /// The peer answered, but its own local get failed for this key.
    #[error("peer rejected key: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Caller passed an argument the cache cannot work with (e.g. empty key).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The loader returned an error. Displayed verbatim.
    #[error("{0}")]
    LoadFailed(Arc<anyhow::Error>),

    /// Remote fetch failed. Recovered inside `Group::get`, never returned from it.
    #[error(transparent)]
    Remote(#[from] FetchError),

    /// Setup-time misuse: double peer registration, duplicate group, bad options.
    #[error("misconfiguration: {0}")]
    Misconfiguration(String),

    /// No group with this name exists in the registry.
    #[error("no such group: {0}")]
    GroupNotFound(String),
}

impl CacheError {
    pub fn load_failed(err: anyhow::Error) -> Self {
        CacheError::LoadFailed(Arc::new(err))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CacheError::InvalidArgument(_))
    }

    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, CacheError::Misconfiguration(_))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
