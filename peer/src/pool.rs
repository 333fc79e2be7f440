//! The HTTP peer pool and fetch-from-peer transport.
//!
//! A pool holds one consistent-hash ring over peer base URLs plus one
//! [`HttpFetcher`] per remote peer. Membership changes rebuild both
//! wholesale under a single mutex; there is no incremental patching.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cache_core::{Error, PeerFetcher, PeerPicker};
use hash_ring::Ring;
use parking_lot::Mutex;
use protocol_wire::{GetRequest, GetResponse, Message};
use tokio_util::sync::CancellationToken;

/// URL prefix under which peers serve cache values.
pub const DEFAULT_BASE_PATH: &str = "/_groupcache/";

/// Configuration for an [`HttpPeerPool`].
pub struct HttpPoolOptions {
    /// URL prefix for the peer RPC. Must start and end with a slash.
    pub base_path: String,
    /// Virtual points per peer on the ring.
    pub replicas: usize,
    /// Ring hash override; CRC-32/IEEE when unset.
    pub hash: Option<hash_ring::HashFn>,
}

impl Default for HttpPoolOptions {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: hash_ring::DEFAULT_REPLICAS,
            hash: None,
        }
    }
}

/// Picks owning peers for keys and hands out their fetchers.
///
/// `self_addr` is this peer's own base URL (e.g. `http://10.0.0.2:8081`).
/// Picking a key the local process owns yields `None`, which sends the
/// engine to its local loader.
pub struct HttpPeerPool {
    self_addr: String,
    options: HttpPoolOptions,
    client: reqwest::Client,
    state: Mutex<PoolState>,
}

struct PoolState {
    ring: Ring,
    fetchers: HashMap<String, Arc<HttpFetcher>>,
}

impl HttpPeerPool {
    /// A pool with default options.
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self::with_options(self_addr, HttpPoolOptions::default())
    }

    pub fn with_options(self_addr: impl Into<String>, options: HttpPoolOptions) -> Self {
        let ring = Self::build_ring(&options);
        Self {
            self_addr: self_addr.into(),
            options,
            client: reqwest::Client::new(),
            state: Mutex::new(PoolState {
                ring,
                fetchers: HashMap::new(),
            }),
        }
    }

    fn build_ring(options: &HttpPoolOptions) -> Ring {
        match &options.hash {
            Some(hash) => Ring::with_hasher(options.replicas, hash.clone()),
            None => Ring::new(options.replicas),
        }
    }

    /// This peer's own base URL.
    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// The URL prefix peers serve under.
    pub fn base_path(&self) -> &str {
        &self.options.base_path
    }

    /// Replace the pool's peer set.
    ///
    /// Each peer value must be a valid base URL. The ring and the fetcher
    /// table are rebuilt from scratch; the local address participates in
    /// the ring (so ownership is stable across the fleet) but never gets a
    /// fetcher.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();

        let mut ring = Self::build_ring(&self.options);
        ring.add(peers.iter().cloned());

        let fetchers = peers
            .iter()
            .filter(|peer| **peer != self.self_addr)
            .map(|peer| {
                let base_url = format!("{}{}", peer, self.options.base_path);
                (
                    peer.clone(),
                    Arc::new(HttpFetcher::new(self.client.clone(), base_url)),
                )
            })
            .collect();

        let mut state = self.state.lock();
        state.ring = ring;
        state.fetchers = fetchers;
        tracing::debug!(peers = peers.len(), "peer set installed");
    }
}

impl PeerPicker for HttpPeerPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>> {
        let state = self.state.lock();
        let owner = state.ring.pick(key)?;
        if owner == self.self_addr {
            return None;
        }
        state
            .fetchers
            .get(owner)
            .cloned()
            .map(|fetcher| fetcher as Arc<dyn PeerFetcher>)
    }
}

/// Issues the framed fetch-from-peer request against one peer.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl PeerFetcher for HttpFetcher {
    async fn fetch(
        &self,
        ctx: &CancellationToken,
        req: &GetRequest,
    ) -> Result<GetResponse, Error> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(Error::peer_fetch)?;
        url.path_segments_mut()
            .map_err(|_| Error::peer_fetch("base url cannot hold path segments"))?
            .pop_if_empty()
            .push(&req.group)
            .push(&req.key);

        let response = tokio::select! {
            _ = ctx.cancelled() => return Err(Error::Canceled),
            result = self.client.get(url).send() => result.map_err(Error::peer_fetch)?,
        };
        if !response.status().is_success() {
            return Err(Error::peer_fetch(format!(
                "server returned: {}",
                response.status()
            )));
        }

        let body = tokio::select! {
            _ = ctx.cancelled() => return Err(Error::Canceled),
            result = response.bytes() => result.map_err(|e| Error::peer_fetch(format!("reading response body: {e}")))?,
        };
        GetResponse::decode(&body)
            .map_err(|e| Error::decode(format!("decoding response body: {e}")))
    }
}
