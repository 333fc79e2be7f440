//! Demo backing store.
//!
//! A seeded in-memory key/value map standing in for the real data source.
//! Useful for trying a cluster out of the box; production deployments
//! supply their own [`Loader`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use cache_core::{Error, Loader, Sink};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// An in-memory data source with a handful of seeded entries.
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
    fills: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        let seed: [(&str, &str); 10] = [
            ("apple", "red"),
            ("banana", "yellow"),
            ("orange", "orange"),
            ("grape", "purple"),
            ("kiwi", "green"),
            ("cat", "meow"),
            ("dog", "woof"),
            ("bird", "tweet"),
            ("fish", "blub"),
            ("lion", "roar"),
        ];
        Self {
            data: RwLock::new(
                seed.into_iter()
                    .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                    .collect(),
            ),
            fills: AtomicU64::new(0),
        }
    }

    /// Insert or replace an entry.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.data.write().insert(key.into(), value.into());
    }

    /// Number of loads that have reached this store.
    pub fn fills(&self) -> u64 {
        self.fills.load(Ordering::Relaxed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Loader for MemoryStore {
    async fn load(
        &self,
        _ctx: &CancellationToken,
        key: &str,
        dest: &mut dyn Sink,
    ) -> Result<(), Error> {
        let fills = self.fills.fetch_add(1, Ordering::Relaxed) + 1;
        let value = self.data.read().get(key).cloned();
        tracing::debug!(key, fills, found = value.is_some(), "datastore lookup");

        match value {
            Some(value) => dest.set_bytes(&value),
            None => Err(Error::loader(format!("key not found in datastore: {key}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_core::AllocatingByteSink;

    #[tokio::test]
    async fn test_seeded_lookup() {
        let store = MemoryStore::new();
        let ctx = CancellationToken::new();

        let mut buf = Vec::new();
        let mut sink = AllocatingByteSink::new(&mut buf);
        store.load(&ctx, "apple", &mut sink).await.unwrap();
        assert_eq!(buf, b"red");
        assert_eq!(store.fills(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_a_loader_error() {
        let store = MemoryStore::new();
        let ctx = CancellationToken::new();

        let mut buf = Vec::new();
        let mut sink = AllocatingByteSink::new(&mut buf);
        let err = store.load(&ctx, "nope", &mut sink).await.unwrap_err();
        assert!(matches!(err, Error::Loader(_)));
    }
}
