//! Herd cache node binary.

use std::path::PathBuf;

use clap::Parser;
use server::banner::{print_banner, BannerConfig};
use server::config::Config;
use server::node::Node;
use server::logging;

#[derive(Parser)]
#[command(name = "herd")]
#[command(about = "Distributed read-through cache node")]
struct Args {
    /// Path to configuration file
    config: Option<PathBuf>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() {
    let args = Args::parse();

    if args.print_config {
        print_default_config();
        return;
    }

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Failed to load config: {}", err);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    if let Err(err) = run(config) {
        eprintln!("Server error: {}", err);
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(&config.logging);

    print_banner(&BannerConfig {
        version: env!("CARGO_PKG_VERSION"),
        group: &config.cache.group,
        cache_bytes: config.cache.cache_bytes,
        api_addr: config.node.api_addr,
        groupcache_addr: config.node.groupcache_addr,
        base_path: &config.rpc.base_path,
        initial_peers: config.membership.initial_peers.len(),
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let node = Node::start(config).await?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
            }
            _ = terminate() => {
                tracing::info!("terminate received");
            }
        }

        node.shutdown().await;
        Ok(())
    })
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::error!(%err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

fn print_default_config() {
    let config = r#"# Herd node configuration

[node]
# Address the admin/API server listens on
api_addr = "0.0.0.0:8080"

# Address the peer RPC server listens on
groupcache_addr = "0.0.0.0:8081"

# Base URLs other peers use to reach this node. Set these when listening
# on a wildcard address or behind NAT.
# advertise_api_addr = "http://10.0.0.2:8080"
# advertise_groupcache_addr = "http://10.0.0.2:8081"

[cache]
# Name of the cache group this node serves
group = "default"

# Combined byte budget for the main and hot segments (e.g., "64MB", "1GB")
cache_bytes = "64MB"

# Probability of mirroring a peer-fetched value into the hot segment
hot_sample_rate = 0.1

# Evict hot first while hot > main / ratio
hot_cap_ratio = 8

[rpc]
# URL prefix the peer RPC is mounted under
base_path = "/_groupcache/"

# Virtual nodes per peer on the consistent-hash ring
replicas = 50

[membership]
# Admin base URLs of the initial contact points
# initial_peers = ["http://10.0.0.1:8080"]

# Seconds a peer may stay silent before it is pruned
peer_timeout_secs = 15

# Seconds between announces to the initial peers
announce_interval_secs = 30

# Seconds between heartbeats to known peers
heartbeat_interval_secs = 5

[logging]
# Log level filter (e.g., "info", "debug", "server=debug,info")
level = "info"

# Output format: "pretty", "json", or "compact"
format = "pretty"
"#;
    print!("{}", config);
}
