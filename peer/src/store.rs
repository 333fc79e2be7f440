//! The peer table.
//!
//! A [`PeerStore`] remembers every peer it has heard from, when it last
//! heard from it, and which admin address to reach it on. Peers that stay
//! silent past the liveness window are pruned. Whenever the sorted live
//! set changes, the store pushes it into the [`HttpPeerPool`] so the ring
//! is rebuilt; an unchanged set skips the rebuild entirely.
//!
//! The local peer is always present in the table and is never pruned. It
//! participates in the ring like everyone else; the pool reports a
//! self-pick to the engine as "no remote peer".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::pool::HttpPeerPool;
use crate::protocol::AnnouncePayload;

/// How long a peer may stay silent before it is dropped.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(15);

/// One known peer.
#[derive(Debug, Clone)]
pub struct PeerEntry {
    pub groupcache_address: String,
    pub api_address: String,
    pub last_seen: Instant,
}

struct StoreInner {
    /// Keyed by the peer's groupcache address.
    peers: HashMap<String, PeerEntry>,
    /// The live set most recently installed in the pool.
    last_synced: Vec<String>,
}

/// Tracks known peers and keeps the pool's peer set current.
pub struct PeerStore {
    self_gc_addr: String,
    self_api_addr: String,
    initial_peer_api_addrs: Vec<String>,
    pool: Arc<HttpPeerPool>,
    peer_timeout: Duration,
    inner: Mutex<StoreInner>,
}

impl PeerStore {
    pub fn new(
        self_api_addr: impl Into<String>,
        self_gc_addr: impl Into<String>,
        initial_peer_api_addrs: Vec<String>,
        pool: Arc<HttpPeerPool>,
        peer_timeout: Duration,
    ) -> Arc<Self> {
        let self_gc_addr = self_gc_addr.into();
        let self_api_addr = self_api_addr.into();

        let mut peers = HashMap::new();
        peers.insert(
            self_gc_addr.clone(),
            PeerEntry {
                groupcache_address: self_gc_addr.clone(),
                api_address: self_api_addr.clone(),
                last_seen: Instant::now(),
            },
        );

        let timeout = if peer_timeout.is_zero() {
            DEFAULT_PEER_TIMEOUT
        } else {
            peer_timeout
        };
        tracing::info!(
            self_addr = %self_gc_addr,
            api_addr = %self_api_addr,
            timeout = ?timeout,
            "peer store initialized"
        );

        Arc::new(Self {
            self_gc_addr,
            self_api_addr,
            initial_peer_api_addrs,
            pool,
            peer_timeout: timeout,
            inner: Mutex::new(StoreInner {
                peers,
                last_synced: Vec::new(),
            }),
        })
    }

    /// Record a peer sighting. Returns true if the peer is new or its
    /// admin address changed, which is what warrants a ring rebuild.
    pub fn add_or_update(&self, groupcache_addr: &str, api_addr: &str) -> bool {
        let mut inner = self.inner.lock();
        let previous = inner.peers.insert(
            groupcache_addr.to_string(),
            PeerEntry {
                groupcache_address: groupcache_addr.to_string(),
                api_address: api_addr.to_string(),
                last_seen: Instant::now(),
            },
        );

        match previous {
            None => {
                tracing::info!(peer = groupcache_addr, api = api_addr, "discovered new peer");
                true
            }
            Some(entry) if entry.api_address != api_addr => {
                tracing::info!(
                    peer = groupcache_addr,
                    old = %entry.api_address,
                    new = api_addr,
                    "peer admin address changed"
                );
                true
            }
            Some(_) => false,
        }
    }

    /// Drop peers past the liveness window and return the sorted live set
    /// (including the local peer, which is never stale).
    pub fn live_peers_and_prune(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        self.prune_locked(&mut inner)
    }

    fn prune_locked(&self, inner: &mut StoreInner) -> Vec<String> {
        let now = Instant::now();
        let timeout = self.peer_timeout;
        let self_addr = &self.self_gc_addr;

        let mut removed = 0;
        inner.peers.retain(|addr, entry| {
            if addr == self_addr || now.duration_since(entry.last_seen) < timeout {
                true
            } else {
                tracing::info!(peer = %addr, api = %entry.api_address, "pruning silent peer");
                removed += 1;
                false
            }
        });
        if removed > 0 {
            tracing::info!(removed, remaining = inner.peers.len(), "pruned silent peers");
        }

        let mut live: Vec<String> = inner.peers.keys().cloned().collect();
        live.sort();
        live
    }

    /// Prune, then install the live set into the pool if it changed.
    /// Returns true when the pool was updated.
    pub fn sync_pool(&self) -> bool {
        let mut inner = self.inner.lock();
        let live = self.prune_locked(&mut inner);
        if live == inner.last_synced {
            return false;
        }
        tracing::info!(
            old = ?inner.last_synced,
            new = ?live,
            "live peer set changed, rebuilding ring"
        );
        self.pool.set_peers(live.iter().cloned());
        inner.last_synced = live;
        true
    }

    /// Snapshot of every known peer, the local one included.
    pub fn known_peers(&self) -> Vec<PeerEntry> {
        self.inner.lock().peers.values().cloned().collect()
    }

    /// Known peers other than the local one, for heartbeat fan-out.
    pub fn heartbeat_targets(&self) -> Vec<PeerEntry> {
        self.inner
            .lock()
            .peers
            .values()
            .filter(|entry| entry.groupcache_address != self.self_gc_addr)
            .cloned()
            .collect()
    }

    /// Number of known peers excluding the local one.
    pub fn remote_peer_count(&self) -> usize {
        self.inner.lock().peers.len().saturating_sub(1)
    }

    /// The record this peer sends when announcing or heartbeating.
    pub fn announce_payload(&self) -> AnnouncePayload {
        AnnouncePayload {
            groupcache_address: self.self_gc_addr.clone(),
            api_address: self.self_api_addr.clone(),
        }
    }

    pub fn initial_peer_api_addrs(&self) -> &[String] {
        &self.initial_peer_api_addrs
    }

    pub fn self_gc_addr(&self) -> &str {
        &self.self_gc_addr
    }

    pub fn self_api_addr(&self) -> &str {
        &self.self_api_addr
    }

    pub fn peer_timeout(&self) -> Duration {
        self.peer_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_timeout(timeout: Duration) -> Arc<PeerStore> {
        let pool = Arc::new(HttpPeerPool::new("http://self:8081"));
        PeerStore::new(
            "http://self:8080",
            "http://self:8081",
            vec![],
            pool,
            timeout,
        )
    }

    #[test]
    fn test_self_is_always_known() {
        let store = store_with_timeout(DEFAULT_PEER_TIMEOUT);
        let live = store.live_peers_and_prune();
        assert_eq!(live, vec!["http://self:8081".to_string()]);
        assert_eq!(store.remote_peer_count(), 0);
    }

    #[test]
    fn test_add_or_update_reports_changes() {
        let store = store_with_timeout(DEFAULT_PEER_TIMEOUT);

        assert!(store.add_or_update("http://a:8081", "http://a:8080"));
        // A refresh with identical data is not a change.
        assert!(!store.add_or_update("http://a:8081", "http://a:8080"));
        // A moved admin address is.
        assert!(store.add_or_update("http://a:8081", "http://a:9090"));
    }

    #[test]
    fn test_live_set_is_sorted_and_includes_self() {
        let store = store_with_timeout(DEFAULT_PEER_TIMEOUT);
        store.add_or_update("http://z:8081", "http://z:8080");
        store.add_or_update("http://a:8081", "http://a:8080");

        assert_eq!(
            store.live_peers_and_prune(),
            vec![
                "http://a:8081".to_string(),
                "http://self:8081".to_string(),
                "http://z:8081".to_string(),
            ]
        );
    }

    #[test]
    fn test_silent_peer_is_pruned_but_self_survives() {
        let store = store_with_timeout(Duration::from_millis(40));
        store.add_or_update("http://a:8081", "http://a:8080");

        std::thread::sleep(Duration::from_millis(60));
        let live = store.live_peers_and_prune();
        assert_eq!(live, vec!["http://self:8081".to_string()]);
    }

    #[test]
    fn test_sync_pool_skips_unchanged_set() {
        let store = store_with_timeout(DEFAULT_PEER_TIMEOUT);
        assert!(store.sync_pool(), "first sync installs the initial set");
        assert!(!store.sync_pool(), "unchanged set must not rebuild");

        store.add_or_update("http://a:8081", "http://a:8080");
        assert!(store.sync_pool(), "new peer changes the live set");
        assert!(!store.sync_pool());
    }

    #[test]
    fn test_heartbeat_targets_exclude_self() {
        let store = store_with_timeout(DEFAULT_PEER_TIMEOUT);
        store.add_or_update("http://a:8081", "http://a:8080");

        let targets = store.heartbeat_targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].groupcache_address, "http://a:8081");
    }

    #[test]
    fn test_zero_timeout_falls_back_to_default() {
        let store = store_with_timeout(Duration::ZERO);
        assert_eq!(store.peer_timeout(), DEFAULT_PEER_TIMEOUT);
    }
}
