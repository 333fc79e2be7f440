//! Node assembly and lifecycle.
//!
//! A [`Node`] wires the whole stack together: registry, group, peer pool,
//! peer store, membership service, and the two HTTP servers (peer RPC and
//! admin/API). Both servers drain gracefully on shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use cache_core::{Group, GroupConfig, Loader, Registry};
use peer::{HttpPeerPool, HttpPoolOptions, PeerService, PeerServiceConfig, PeerStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::datastore::MemoryStore;
use crate::{admin, rpc};

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub group: Arc<Group>,
    pub store: Arc<PeerStore>,
    pub shutdown: CancellationToken,
}

/// A running cache node.
pub struct Node {
    pub registry: Registry,
    pub group: Arc<Group>,
    pub store: Arc<PeerStore>,
    pub pool: Arc<HttpPeerPool>,
    /// Actual bound admin/API address (useful with port 0).
    pub api_addr: SocketAddr,
    /// Actual bound peer RPC address.
    pub groupcache_addr: SocketAddr,
    service: PeerService,
    shutdown: CancellationToken,
    servers: Vec<JoinHandle<()>>,
}

impl Node {
    /// Start a node backed by the demo in-memory datastore.
    pub async fn start(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_with_loader(config, Arc::new(MemoryStore::new())).await
    }

    /// Start a node with a caller-supplied loader.
    pub async fn start_with_loader(
        config: Config,
        loader: Arc<dyn Loader>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        // Bind before anything else so advertise addresses can follow the
        // actual ports when the config asks for ephemeral ones.
        let rpc_listener = tokio::net::TcpListener::bind(config.node.groupcache_addr).await?;
        let api_listener = tokio::net::TcpListener::bind(config.node.api_addr).await?;
        let groupcache_addr = rpc_listener.local_addr()?;
        let api_addr = api_listener.local_addr()?;

        let advertise_gc = config
            .node
            .advertise_groupcache_addr
            .clone()
            .unwrap_or_else(|| format!("http://{groupcache_addr}"));
        let advertise_api = config
            .node
            .advertise_api_addr
            .clone()
            .unwrap_or_else(|| format!("http://{api_addr}"));

        let shutdown = CancellationToken::new();
        let registry = Registry::new();

        let pool = Arc::new(HttpPeerPool::with_options(
            advertise_gc.clone(),
            HttpPoolOptions {
                base_path: config.rpc.base_path.clone(),
                replicas: config.rpc.replicas,
                hash: None,
            },
        ));
        registry.set_peer_picker(pool.clone());

        let store = PeerStore::new(
            advertise_api.clone(),
            advertise_gc.clone(),
            config.membership.initial_peers.clone(),
            pool.clone(),
            config.membership.peer_timeout(),
        );
        store.sync_pool();

        let group = registry.add_group(
            &config.cache.group,
            GroupConfig {
                cache_bytes: config.cache.cache_bytes,
                hot_sample_rate: config.cache.hot_sample_rate,
                hot_cap_ratio: config.cache.hot_cap_ratio,
            },
            loader,
        );

        let state = AppState {
            registry: registry.clone(),
            group: group.clone(),
            store: store.clone(),
            shutdown: shutdown.clone(),
        };

        let servers = vec![
            spawn_server(
                "rpc",
                rpc_listener,
                rpc::router(state.clone(), &config.rpc.base_path),
                shutdown.clone(),
            ),
            spawn_server("admin", api_listener, admin::router(state), shutdown.clone()),
        ];

        let service = PeerService::start(
            store.clone(),
            PeerServiceConfig {
                announce_interval: config.membership.announce_interval(),
                heartbeat_interval: config.membership.heartbeat_interval(),
                ..PeerServiceConfig::default()
            },
            &shutdown,
        );

        tracing::info!(
            rpc = %groupcache_addr,
            admin = %api_addr,
            advertise = %advertise_gc,
            group = %config.cache.group,
            "node started"
        );

        Ok(Self {
            registry,
            group,
            store,
            pool,
            api_addr,
            groupcache_addr,
            service,
            shutdown,
            servers,
        })
    }

    /// Token cancelled when the node shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the membership loops and drain both HTTP servers.
    pub async fn shutdown(self) {
        tracing::info!("node shutting down");
        self.shutdown.cancel();
        self.service.shutdown().await;
        for server in self.servers {
            let _ = server.await;
        }
        tracing::info!("node stopped");
    }
}

fn spawn_server(
    name: &'static str,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await;
        if let Err(err) = result {
            tracing::error!(server = name, %err, "http server failed");
        } else {
            tracing::debug!(server = name, "http server stopped");
        }
    })
}
