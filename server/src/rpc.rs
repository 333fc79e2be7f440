//! The peer RPC serving endpoint.
//!
//! Peers fetch values with `GET {base_path}{group}/{key}`; the response
//! body is a protobuf-encoded `GetResponse`. Serving runs without a flight
//! collapser of its own: concurrent requests for one key enter the local
//! group path, where they are deduplicated like any other callers.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use cache_core::AllocatingByteSink;
use protocol_wire::{Encode, GetResponse};

use crate::metrics;
use crate::node::AppState;

/// Build the peer RPC router mounted under `base_path`.
pub fn router(state: AppState, base_path: &str) -> Router {
    let path = format!("{base_path}{{group}}/{{key}}");
    Router::new().route(&path, get(serve_get)).with_state(state)
}

async fn serve_get(
    State(state): State<AppState>,
    Path((group_name, key)): Path<(String, String)>,
) -> Response {
    metrics::RPC_REQUESTS.increment();

    let Some(group) = state.registry.get_group(&group_name) else {
        return (
            StatusCode::NOT_FOUND,
            format!("no such group: {group_name}"),
        )
            .into_response();
    };
    group.stats().server_requests.increment();

    let ctx = state.shutdown.child_token();
    let mut value = Vec::new();
    let result = {
        let mut sink = AllocatingByteSink::new(&mut value);
        group.get(&ctx, &key, &mut sink).await
    };

    match result {
        Ok(()) => {
            let body = GetResponse::with_value(value).encode_to_vec();
            (
                [(header::CONTENT_TYPE, "application/x-protobuf")],
                body,
            )
                .into_response()
        }
        Err(err) => {
            metrics::RPC_ERRORS.increment();
            tracing::debug!(group = %group_name, key, %err, "rpc get failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
