//! Admin surface: health, metrics, ping, status, and the client read path.

use server::config::Config;
use server::node::Node;

fn test_config() -> Config {
    let mut config = Config::default();
    config.node.api_addr = "127.0.0.1:0".parse().unwrap();
    config.node.groupcache_addr = "127.0.0.1:0".parse().unwrap();
    config.cache.cache_bytes = 1 << 20;
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_endpoint() {
    let node = Node::start(test_config()).await.unwrap();
    let client = reqwest::Client::new();

    let url = format!("http://{}/health", node.api_addr);
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_metrics_endpoint() {
    let node = Node::start(test_config()).await.unwrap();
    let client = reqwest::Client::new();

    let url = format!("http://{}/metrics", node.api_addr);
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("# TYPE"), "expected Prometheus output: {body}");

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_lists_live_peers() {
    let node = Node::start(test_config()).await.unwrap();
    let client = reqwest::Client::new();

    let url = format!("http://{}/ping", node.api_addr);
    let body = client.get(&url).send().await.unwrap().text().await.unwrap();
    assert!(body.starts_with("pong from "), "unexpected body: {body}");
    assert!(body.contains(node.store.self_gc_addr()));

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_get_serves_seeded_value_and_counts_hits() {
    let node = Node::start(test_config()).await.unwrap();
    let client = reqwest::Client::new();

    let url = format!("http://{}/get?key=apple", node.api_addr);
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "red");

    // Second read is a cache hit, visible in /status.
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let url = format!("http://{}/status", node.api_addr);
    let status: serde_json::Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["group"], "default");
    assert_eq!(status["stats"]["gets"], 2);
    assert_eq!(status["stats"]["cache_hits"], 1);
    assert_eq!(status["stats"]["local_loads"], 1);
    assert_eq!(status["main"]["items"], 1);

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_get_missing_key_param_is_400() {
    let node = Node::start(test_config()).await.unwrap();
    let client = reqwest::Client::new();

    let url = format!("http://{}/get", node.api_addr);
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 400);

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_get_unknown_key_is_500_loader_error() {
    let node = Node::start(test_config()).await.unwrap();
    let client = reqwest::Client::new();

    let url = format!("http://{}/get?key=not-seeded", node.api_addr);
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 500);
    let body = response.text().await.unwrap();
    assert!(body.contains("not-seeded"), "error should name the key: {body}");

    node.shutdown().await;
}
