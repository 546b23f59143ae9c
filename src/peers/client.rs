//! HTTP client side of the peer transport.

use super::protocol::FetchResponse;
use super::types::{BoxFuture, PeerFetcher};
use crate::cache::ByteView;
use crate::error::FetchError;

use reqwest::{StatusCode, Url};
use std::time::Duration;

pub struct HttpFetcher {
    /// Peer address, e.g. `http://10.0.0.2:8001`.
    peer: String,
    /// `peer` joined with the base path, e.g. `http://10.0.0.2:8001/_distcache/`.
    base_url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(peer: &str, base_path: &str, timeout: Duration, http_client: reqwest::Client) -> Self {
        Self {
            peer: peer.to_string(),
            base_url: format!("{}{}", peer.trim_end_matches('/'), base_path),
            timeout,
            http_client,
        }
    }

    fn url_for(&self, group: &str, key: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Unavailable(format!("bad peer url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Unavailable(format!("peer url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push(group)
            .push(key);
        Ok(url)
    }

    async fn get(&self, group: &str, key: &str) -> Result<ByteView, FetchError> {
        let url = self.url_for(group, key)?;

        let response = self
            .http_client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Unavailable(format!("{}: {}", self.peer, e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Unavailable(format!("{}: reading body: {}", self.peer, e)))?;

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return Err(FetchError::Rejected(String::from_utf8_lossy(&body).into_owned()));
        }
        if !status.is_success() {
            return Err(FetchError::Unavailable(format!(
                "{} returned {}: {}",
                self.peer,
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        let decoded = FetchResponse::decode(&body)
            .map_err(|e| FetchError::Unavailable(format!("{}: malformed response: {}", self.peer, e)))?;

        Ok(ByteView::from(decoded.value))
    }
}

impl PeerFetcher for HttpFetcher {
    fn peer(&self) -> &str {
        &self.peer
    }

    fn fetch<'a>(&'a self, group: &'a str, key: &'a str) -> BoxFuture<'a, Result<ByteView, FetchError>> {
        Box::pin(self.get(group, key))
    }
}
