use axum::extract::Query;
use axum::http::StatusCode;
use axum::{Extension, Json, Router, routing::get};
use distcache::config::{CacheConfig, DEFAULT_CACHE_BYTES, PoolOptions};
use distcache::group::{Group, GroupStatsSnapshot};
use distcache::peers::handlers::router;
use distcache::{GroupRegistry, HttpPool, loader_fn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

const API_ADDR: &str = "127.0.0.1:9999";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut port: u16 = 8001;
    let mut peers: Vec<String> = vec![];
    let mut api = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                port = args[i + 1].parse()?;
                i += 2;
            }
            "--peer" if i + 1 < args.len() => {
                peers.push(args[i + 1].clone());
                i += 2;
            }
            "--api" => {
                api = true;
                i += 1;
            }
            "--help" | "-h" => {
                eprintln!("Usage: {} [--port <port>] [--peer <url>]... [--api]", args[0]);
                eprintln!(
                    "Example: {} --port 8001 --peer http://localhost:8001 --peer http://localhost:8002 --api",
                    args[0]
                );
                return Ok(());
            }
            other => {
                tracing::warn!("Ignoring unknown argument: {}", other);
                i += 1;
            }
        }
    }

    if peers.is_empty() {
        peers = (8001..=8003).map(|p| format!("http://localhost:{}", p)).collect();
    }

    let registry = GroupRegistry::new();
    let scores = create_scores_group(&registry, &CacheConfig::new("scores", DEFAULT_CACHE_BYTES))?;

    // 1. Peer pool:
    let self_addr = format!("http://localhost:{}", port);
    let pool = HttpPool::new(&self_addr, PoolOptions::default())?;
    pool.set_peers(&peers);
    scores.register_peers(pool.clone())?;

    // 2. Frontend API:
    if api {
        let group = scores.clone();
        tokio::spawn(async move {
            if let Err(e) = start_api_server(group).await {
                tracing::error!("API server failed: {}", e);
            }
        });
    }

    // 3. Peer server:
    let app = router(registry.clone(), pool.base_path());
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    tracing::info!("distcache is running at {}", self_addr);
    tracing::info!("Peers: {:?}", pool.peers());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn create_scores_group(registry: &GroupRegistry, config: &CacheConfig) -> anyhow::Result<Arc<Group>> {
    let db: Arc<HashMap<String, String>> = Arc::new(
        [("Tom", "630"), ("Jack", "589"), ("Sam", "567")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    );

    let group = registry.create_group(
        &config.name,
        config.cache_bytes,
        loader_fn(move |key: String| {
            let db = db.clone();
            async move {
                tracing::info!("[SlowDB] search key {}", key);
                match db.get(&key) {
                    Some(value) => Ok(value.clone().into_bytes()),
                    None => Err(anyhow::anyhow!("{} not exist", key)),
                }
            }
        }),
    )?;
    Ok(group)
}

#[derive(Deserialize)]
struct ApiParams {
    key: String,
}

#[derive(Serialize)]
struct StatsResponse {
    group: String,
    stats: GroupStatsSnapshot,
    cache: distcache::cache::CacheStats,
}

async fn start_api_server(group: Arc<Group>) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/api", get(handle_api))
        .route("/stats", get(handle_stats))
        .layer(Extension(group));

    tracing::info!("Frontend server is running at http://{}", API_ADDR);
    let listener = tokio::net::TcpListener::bind(API_ADDR).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_api(
    Extension(group): Extension<Arc<Group>>,
    Query(params): Query<ApiParams>,
) -> (StatusCode, Vec<u8>) {
    match group.get(&params.key).await {
        Ok(value) => (StatusCode::OK, value.byte_slice()),
        Err(e) if e.is_invalid_argument() => (StatusCode::BAD_REQUEST, e.to_string().into_bytes()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string().into_bytes()),
    }
}

async fn handle_stats(Extension(group): Extension<Arc<Group>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        group: group.name().to_string(),
        stats: group.stats(),
        cache: group.cache_stats(),
    })
}
