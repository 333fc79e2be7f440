//! Background membership loops.
//!
//! Three cooperative tasks per peer:
//!
//! - the announcer introduces this peer to its configured initial peers
//!   and merges the peer lists they reply with;
//! - the heartbeater tells every known peer we are still alive;
//! - the pruner drops peers that have stayed silent past the liveness
//!   window and rebuilds the ring when that changes anything.
//!
//! All three exit promptly when the service is shut down.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{self, membership_client};
use crate::protocol::AnnounceResponse;
use crate::store::PeerStore;

/// Cadence of the membership loops.
#[derive(Debug, Clone)]
pub struct PeerServiceConfig {
    /// How often to announce to the initial peers.
    pub announce_interval: Duration,
    /// How often to heartbeat every known peer.
    pub heartbeat_interval: Duration,
    /// Grace period before the first announce, so initial peers get a
    /// chance to come up.
    pub initial_announce_delay: Duration,
}

impl Default for PeerServiceConfig {
    fn default() -> Self {
        Self {
            announce_interval: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(5),
            initial_announce_delay: Duration::from_secs(5),
        }
    }
}

/// Handle over the running membership tasks.
pub struct PeerService {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PeerService {
    /// Spawn the announce, heartbeat, and prune loops.
    ///
    /// The loops stop when `parent` is cancelled or [`PeerService::shutdown`]
    /// is called, whichever comes first.
    pub fn start(store: Arc<PeerStore>, config: PeerServiceConfig, parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let client = membership_client();

        let tasks = vec![
            tokio::spawn(announcer(
                store.clone(),
                client.clone(),
                config.clone(),
                token.clone(),
            )),
            tokio::spawn(heartbeater(
                store.clone(),
                client,
                config.heartbeat_interval,
                token.clone(),
            )),
            tokio::spawn(pruner(store, token.clone())),
        ];

        Self { token, tasks }
    }

    /// Stop the loops and wait for them to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

async fn announcer(
    store: Arc<PeerStore>,
    client: reqwest::Client,
    config: PeerServiceConfig,
    token: CancellationToken,
) {
    tracing::debug!("announcer started");
    tokio::select! {
        _ = token.cancelled() => return,
        _ = tokio::time::sleep(config.initial_announce_delay) => {}
    }

    let mut ticker = tokio::time::interval(config.announce_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // Initial peers we have reached at least once; they are re-contacted
    // only if this peer loses sight of the whole fleet.
    let mut announced: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("announcer stopping");
                return;
            }
            _ = ticker.tick() => {}
        }

        let initial_peers = store.initial_peer_api_addrs().to_vec();
        if initial_peers.is_empty() {
            continue;
        }
        let remote_count = store.remote_peer_count();

        for target in &initial_peers {
            if target == store.self_api_addr() {
                continue;
            }
            if announced.contains(target) && remote_count > 0 {
                continue;
            }

            let url = format!("{target}/admin/announce_self");
            match client::post_json::<_, AnnounceResponse>(&client, &url, &store.announce_payload())
                .await
            {
                Ok(response) => {
                    announced.insert(target.clone());
                    tracing::debug!(
                        target = %url,
                        peers = response.known_peers.len(),
                        "announce accepted"
                    );

                    let mut changed = false;
                    for peer in response.known_peers {
                        if peer.groupcache_address == store.self_gc_addr() {
                            continue;
                        }
                        if store.add_or_update(&peer.groupcache_address, &peer.api_address) {
                            changed = true;
                        }
                    }
                    if changed {
                        store.sync_pool();
                    }
                }
                Err(err) => {
                    // Retried next tick; staleness is the pruner's problem.
                    tracing::debug!(target = %url, %err, "announce failed");
                }
            }
        }
    }
}

async fn heartbeater(
    store: Arc<PeerStore>,
    client: reqwest::Client,
    interval: Duration,
    token: CancellationToken,
) {
    tracing::debug!("heartbeater started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("heartbeater stopping");
                return;
            }
            _ = ticker.tick() => {}
        }

        for target in store.heartbeat_targets() {
            let url = format!("{}/admin/heartbeat", target.api_address);
            if let Err(err) =
                client::post_json_discard(&client, &url, &store.announce_payload()).await
            {
                // Tolerated; a peer that stays silent gets pruned.
                tracing::trace!(target = %url, %err, "heartbeat failed");
            }
        }
    }
}

async fn pruner(store: Arc<PeerStore>, token: CancellationToken) {
    let interval =
        (store.peer_timeout() / 2).clamp(Duration::from_secs(1), Duration::from_secs(10));
    tracing::debug!(?interval, "pruner started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("pruner stopping");
                return;
            }
            _ = ticker.tick() => {}
        }
        store.sync_pool();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::HttpPeerPool;

    #[tokio::test]
    async fn test_shutdown_is_prompt() {
        let pool = Arc::new(HttpPeerPool::new("http://self:8081"));
        let store = PeerStore::new(
            "http://self:8080",
            "http://self:8081",
            vec![],
            pool,
            Duration::from_secs(15),
        );

        let parent = CancellationToken::new();
        let service = PeerService::start(store, PeerServiceConfig::default(), &parent);

        tokio::time::timeout(Duration::from_secs(1), service.shutdown())
            .await
            .expect("shutdown must not hang");
    }

    #[tokio::test]
    async fn test_parent_cancellation_stops_loops() {
        let pool = Arc::new(HttpPeerPool::new("http://self:8081"));
        let store = PeerStore::new(
            "http://self:8080",
            "http://self:8081",
            vec![],
            pool,
            Duration::from_secs(15),
        );

        let parent = CancellationToken::new();
        let service = PeerService::start(store, PeerServiceConfig::default(), &parent);
        parent.cancel();

        tokio::time::timeout(Duration::from_secs(1), service.shutdown())
            .await
            .expect("cancelled parent must stop the loops");
    }
}
