//! How a group finds and talks to its peers.
//!
//! The engine is transport-agnostic: it asks a [`PeerPicker`] for the owner
//! of a key and, when a remote peer is nominated, drives the returned
//! [`PeerFetcher`]. The HTTP implementations live in the `peer` crate.

use std::sync::Arc;

use async_trait::async_trait;
use protocol_wire::{GetRequest, GetResponse};
use tokio_util::sync::CancellationToken;

use crate::Error;

/// Fetches a value from one remote peer.
#[async_trait]
pub trait PeerFetcher: Send + Sync {
    async fn fetch(&self, ctx: &CancellationToken, req: &GetRequest)
        -> Result<GetResponse, Error>;
}

/// Locates the peer that owns a particular key.
pub trait PeerPicker: Send + Sync {
    /// Returns the fetcher for the key's owner, or `None` when the owner
    /// is the local process and the load should happen here.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>>;
}

/// A picker that never nominates a remote peer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPeers;

impl PeerPicker for NoPeers {
    fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerFetcher>> {
        None
    }
}
