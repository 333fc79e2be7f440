//! HTTP peers for the cache engine.
//!
//! Three pieces plug the engine into a fleet:
//!
//! - [`HttpPeerPool`] implements [`cache_core::PeerPicker`] over a
//!   consistent-hash ring of peer base URLs; [`HttpFetcher`] issues the
//!   framed fetch-from-peer request.
//! - [`PeerStore`] tracks known peers and their liveness, and feeds the
//!   live set into the pool whenever it changes.
//! - [`PeerService`] runs the announce, heartbeat, and prune loops that
//!   keep the store current.

pub mod client;
pub mod pool;
pub mod protocol;
pub mod service;
pub mod store;

pub use client::ClientError;
pub use pool::{HttpFetcher, HttpPeerPool, HttpPoolOptions, DEFAULT_BASE_PATH};
pub use protocol::{AnnouncePayload, AnnounceResponse};
pub use service::{PeerService, PeerServiceConfig};
pub use store::{PeerEntry, PeerStore, DEFAULT_PEER_TIMEOUT};
