use crate::cache::ByteView;
use crate::error::FetchError;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by the peer traits, so they stay object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Client side of the peer transport, bound to one remote peer.
pub trait PeerFetcher: Send + Sync {
    /// Identity of the peer this fetcher talks to (its base URL for HTTP).
    fn peer(&self) -> &str;

    /// Asks the peer for `key` in group `group`. The peer answers from its
    /// local-only get path and never forwards the request again.
    fn fetch<'a>(&'a self, group: &'a str, key: &'a str) -> BoxFuture<'a, Result<ByteView, FetchError>>;
}

/// Routes keys to the peer that owns them.
pub trait PeerPicker: Send + Sync {
    /// Returns a fetcher for the owner of `key`, or `None` when the key is
    /// owned by this process or no peers are known.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>>;
}
