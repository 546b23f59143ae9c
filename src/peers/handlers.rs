use super::protocol::{CONTENT_TYPE_ENVELOPE, FetchResponse};
use crate::error::CacheError;
use crate::group::GroupRegistry;

use axum::{
    Extension, Router,
    extract::Path,
    http::{StatusCode, header},
    routing::get,
};
use std::sync::Arc;

const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

type PeerResponse = (StatusCode, [(header::HeaderName, &'static str); 1], Vec<u8>);

/// Router answering peer requests at `{base_path}:group/:key`.
///
/// `base_path` must already be normalized (leading and trailing `/`).
pub fn router(registry: Arc<GroupRegistry>, base_path: &str) -> Router {
    let route = format!("{}:group/:key", base_path);
    // `:key` never matches an empty segment, so `{group}/` needs its own route.
    let empty_key_route = format!("{}:group/", base_path);
    Router::new()
        .route(&route, get(handle_fetch))
        .route(&empty_key_route, get(handle_empty_key))
        .layer(Extension(registry))
}

pub async fn handle_empty_key(
    Extension(registry): Extension<Arc<GroupRegistry>>,
    Path(group_name): Path<String>,
) -> PeerResponse {
    if registry.get(&group_name).is_none() {
        return text(StatusCode::NOT_FOUND, format!("no such group: {}", group_name));
    }
    text(StatusCode::BAD_REQUEST, "key is required".to_string())
}

pub async fn handle_fetch(
    Extension(registry): Extension<Arc<GroupRegistry>>,
    Path((group_name, key)): Path<(String, String)>,
) -> PeerResponse {
    tracing::debug!("[Server] GET {}/{}", group_name, key);

    let Some(group) = registry.get(&group_name) else {
        tracing::warn!("[Server] no such group: {}", group_name);
        return text(StatusCode::NOT_FOUND, format!("no such group: {}", group_name));
    };
    group.record_server_request();

    match group.get_locally(&key).await {
        Ok(value) => {
            let envelope = FetchResponse {
                value: value.byte_slice(),
            };
            match envelope.encode() {
                Ok(body) => (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, CONTENT_TYPE_ENVELOPE)],
                    body,
                ),
                Err(e) => {
                    tracing::error!("[Server] failed to encode value for {}: {}", key, e);
                    text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
            }
        }
        Err(e @ CacheError::InvalidArgument(_)) => text(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::debug!("[Server] local get failed for {}/{}: {}", group_name, key, e);
            text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn text(status: StatusCode, message: String) -> PeerResponse {
    (status, [(header::CONTENT_TYPE, CONTENT_TYPE_TEXT)], message.into_bytes())
}
