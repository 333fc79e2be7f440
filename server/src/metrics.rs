//! Node-level metrics.
//!
//! Per-group statistics live on the groups themselves; these counters
//! cover the HTTP surface and are exposed in Prometheus text format on
//! the admin `/metrics` endpoint.

use metriken::{metric, Counter};

#[metric(
    name = "rpc_requests",
    description = "Peer RPC requests served"
)]
pub static RPC_REQUESTS: Counter = Counter::new();

#[metric(
    name = "rpc_errors",
    description = "Peer RPC requests that failed"
)]
pub static RPC_ERRORS: Counter = Counter::new();

#[metric(
    name = "announces_received",
    description = "announce_self requests received"
)]
pub static ANNOUNCES_RECEIVED: Counter = Counter::new();

#[metric(
    name = "heartbeats_received",
    description = "heartbeat requests received"
)]
pub static HEARTBEATS_RECEIVED: Counter = Counter::new();

#[metric(
    name = "api_gets",
    description = "Client-facing get requests received"
)]
pub static API_GETS: Counter = Counter::new();

/// Render all registered metrics in Prometheus text format.
pub fn prometheus_output() -> String {
    let mut output = String::with_capacity(4096);

    for metric in metriken::metrics().iter() {
        let name = metric.name();
        if name.is_empty() {
            continue;
        }
        let Some(value) = metric.value() else {
            continue;
        };

        // Prometheus names allow [a-zA-Z0-9_:] only.
        let prom_name: String = name
            .chars()
            .map(|c: char| {
                if c.is_ascii_alphanumeric() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        match value {
            metriken::Value::Counter(v) => {
                output.push_str(&format!("# TYPE {} counter\n", prom_name));
                output.push_str(&format!("{} {}\n", prom_name, v));
            }
            metriken::Value::Gauge(v) => {
                output.push_str(&format!("# TYPE {} gauge\n", prom_name));
                output.push_str(&format!("{} {}\n", prom_name, v));
            }
            _ => {}
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_output_contains_counters() {
        RPC_REQUESTS.increment();
        let output = prometheus_output();
        assert!(output.contains("# TYPE rpc_requests counter"));
        assert!(output.contains("rpc_requests"));
    }
}
