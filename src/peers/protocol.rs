//! Peer Network Protocol
//!
//! A peer asks the owner of a key with
//!
//! ```text
//! GET {base_path}{group}/{key}
//! ```
//!
//! Both segments are percent-encoded. On success the owner answers `200` with
//! a bincode-encoded [`FetchResponse`]. Failures carry a plain-text reason:
//!
//! | Status | Meaning                                  | Client maps to          |
//! |--------|------------------------------------------|-------------------------|
//! | 400    | malformed path or empty key              | `FetchError::Unavailable` |
//! | 404    | group not registered on the owner        | `FetchError::Unavailable` |
//! | 500    | owner's local get (its loader) failed    | `FetchError::Rejected`    |

use serde::{Deserialize, Serialize};

pub const CONTENT_TYPE_ENVELOPE: &str = "application/octet-stream";

/// Body of a successful peer response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Raw cached bytes.
    pub value: Vec<u8>,
}

impl FetchResponse {
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
