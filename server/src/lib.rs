//! Herd cache node.
//!
//! A fleet of identical nodes sharing one read-through cache: each node
//! serves its peers over the framed RPC endpoint, discovers the fleet
//! through announce/heartbeat, and answers client reads from its local
//! segments, the key's owner, or the backing store.

pub mod admin;
pub mod banner;
pub mod config;
pub mod datastore;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod rpc;

pub use config::Config;
pub use datastore::MemoryStore;
pub use node::{AppState, Node};
