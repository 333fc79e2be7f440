//! Cooperative read-through cache engine.
//!
//! Every peer process hosts the same set of named groups. A get consults
//! local memory, then the peer that owns the key under the consistent
//! hash, and only on a miss at the owner does it invoke the user-supplied
//! loader. Concurrent misses for the same key — locally and, in the common
//! case, across the fleet — collapse into a single load.
//!
//! This crate is transport-agnostic: the HTTP peer pool, the membership
//! subsystem, and the serving endpoint live in the `peer` and `server`
//! crates and plug in through the [`PeerPicker`]/[`PeerFetcher`] traits.

pub mod error;
pub mod group;
pub mod lru;
pub mod peers;
pub mod registry;
pub mod singleflight;
pub mod sink;
pub mod stats;
pub mod view;

pub use error::Error;
pub use group::{Group, GroupConfig, Loader, SegmentKind};
pub use peers::{NoPeers, PeerFetcher, PeerPicker};
pub use registry::Registry;
pub use sink::{
    AllocatingByteSink, ByteViewSink, ProtoSink, Sink, StringSink, TruncatingByteSink,
};
pub use stats::{AtomicCounter, CacheStats, Stats, StatsSnapshot};
pub use view::ByteView;
