//! The admin/API HTTP surface.
//!
//! Membership endpoints (`/admin/announce_self`, `/admin/heartbeat`), the
//! client-facing read path (`/get`), and informational endpoints (peers,
//! stats, health, Prometheus metrics).

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cache_core::{AllocatingByteSink, SegmentKind};
use peer::{AnnouncePayload, AnnounceResponse};
use serde::{Deserialize, Serialize};

use crate::metrics;
use crate::node::AppState;

/// How long a client-facing get may run before it is abandoned.
const API_GET_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the admin router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/admin/announce_self", post(announce_self))
        .route("/admin/heartbeat", post(heartbeat))
        .route("/admin/known_peers", get(known_peers))
        .route("/get", get(api_get))
        .route("/ping", get(ping))
        .route("/status", get(status))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Unpack an announce/heartbeat body, mapping every rejection to 400.
fn valid_payload(
    body: Result<Json<AnnouncePayload>, JsonRejection>,
) -> Result<AnnouncePayload, Response> {
    let Ok(Json(payload)) = body else {
        return Err((StatusCode::BAD_REQUEST, "invalid payload").into_response());
    };
    if payload.groupcache_address.is_empty() || payload.api_address.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "missing groupcache_address or api_address",
        )
            .into_response());
    }
    Ok(payload)
}

/// Record the announcing peer and reply with everyone we know.
async fn announce_self(
    State(state): State<AppState>,
    body: Result<Json<AnnouncePayload>, JsonRejection>,
) -> Response {
    metrics::ANNOUNCES_RECEIVED.increment();
    let payload = match valid_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    tracing::debug!(
        peer = %payload.groupcache_address,
        api = %payload.api_address,
        "announce received"
    );

    state
        .store
        .add_or_update(&payload.groupcache_address, &payload.api_address);
    state.store.sync_pool();

    let known_peers = state
        .store
        .known_peers()
        .into_iter()
        .map(|entry| AnnouncePayload {
            groupcache_address: entry.groupcache_address,
            api_address: entry.api_address,
        })
        .collect();
    Json(AnnounceResponse { known_peers }).into_response()
}

/// Refresh the sender's liveness.
async fn heartbeat(
    State(state): State<AppState>,
    body: Result<Json<AnnouncePayload>, JsonRejection>,
) -> Response {
    metrics::HEARTBEATS_RECEIVED.increment();
    let payload = match valid_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    state
        .store
        .add_or_update(&payload.groupcache_address, &payload.api_address);
    // Syncing here reflects a peer coming back immediately instead of
    // waiting for the next prune tick.
    state.store.sync_pool();
    StatusCode::OK.into_response()
}

/// One known peer as reported by `/admin/known_peers`.
#[derive(Debug, Serialize)]
struct KnownPeer {
    groupcache_address: String,
    api_address: String,
    last_seen_secs_ago: u64,
}

async fn known_peers(State(state): State<AppState>) -> Json<Vec<KnownPeer>> {
    let mut peers: Vec<KnownPeer> = state
        .store
        .known_peers()
        .into_iter()
        .map(|entry| KnownPeer {
            groupcache_address: entry.groupcache_address,
            api_address: entry.api_address,
            last_seen_secs_ago: entry.last_seen.elapsed().as_secs(),
        })
        .collect();
    peers.sort_by(|a, b| a.groupcache_address.cmp(&b.groupcache_address));
    Json(peers)
}

#[derive(Debug, Deserialize)]
struct GetParams {
    key: Option<String>,
}

/// Client-facing read: `GET /get?key=...`.
async fn api_get(State(state): State<AppState>, Query(params): Query<GetParams>) -> Response {
    metrics::API_GETS.increment();
    let Some(key) = params.key.filter(|k| !k.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing \"key\" query parameter").into_response();
    };

    let ctx = state.shutdown.child_token();
    let mut value = Vec::new();
    let result = {
        let mut sink = AllocatingByteSink::new(&mut value);
        tokio::time::timeout(API_GET_TIMEOUT, state.group.get(&ctx, &key, &mut sink)).await
    };

    match result {
        Ok(Ok(())) => (
            [(header::CONTENT_TYPE, "text/plain")],
            value,
        )
            .into_response(),
        Ok(Err(err)) => {
            tracing::debug!(key, %err, "api get failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("getting key {key}: {err}"),
            )
                .into_response()
        }
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("getting key {key}: timed out"),
        )
            .into_response(),
    }
}

/// Node liveness plus a view of the live peer set.
async fn ping(State(state): State<AppState>) -> String {
    let live = state.store.live_peers_and_prune();
    format!(
        "pong from {} (cache at {})\nlive peers: {:?}\n",
        state.store.self_api_addr(),
        state.store.self_gc_addr(),
        live,
    )
}

/// Group and segment statistics as JSON.
#[derive(Debug, Serialize)]
struct StatusBody {
    group: String,
    stats: cache_core::StatsSnapshot,
    main: cache_core::CacheStats,
    hot: cache_core::CacheStats,
}

async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    Json(StatusBody {
        group: state.group.name().to_string(),
        stats: state.group.stats().snapshot(),
        main: state.group.cache_stats(SegmentKind::Main),
        hot: state.group.cache_stats(SegmentKind::Hot),
    })
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics::prometheus_output(),
    )
}
