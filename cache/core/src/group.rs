//! The group engine.
//!
//! A [`Group`] is a named cache namespace with a single loader and a byte
//! budget shared by two LRU segments. The main segment holds keys this
//! process owns under the consistent hash; the hot segment mirrors popular
//! keys owned by other peers so their network cards don't become the
//! bottleneck for hot items.
//!
//! A get checks both segments, then collapses concurrent misses for the
//! same key onto one flight. The flight asks the peer picker for the owner:
//! a remote owner is consulted over RPC (with local fallback on failure), a
//! local owner invokes the user loader and populates the main segment.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use protocol_wire::GetRequest;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::lru::LruCache;
use crate::registry::RegistryInner;
use crate::singleflight::FlightGroup;
use crate::stats::{CacheStats, Stats};
use crate::{ByteView, Error, PeerFetcher, Sink};

/// Loads data for a key.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Load the value identified by `key` and populate `dest`.
    ///
    /// The returned data must be versionless: the key must uniquely
    /// describe the loaded data, with no implicit current time and no
    /// reliance on cache expiration.
    async fn load(
        &self,
        ctx: &CancellationToken,
        key: &str,
        dest: &mut dyn Sink,
    ) -> Result<(), Error>;
}

/// Tunables for one group.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Combined byte budget for the main and hot segments. Zero disables
    /// caching entirely; every get goes to the owner or the loader.
    pub cache_bytes: u64,
    /// Probability of mirroring a peer-fetched value into the hot segment.
    pub hot_sample_rate: f64,
    /// Evict from the hot segment first once `hot > main / ratio`, capping
    /// the hot share at roughly `1/(ratio + 1)` of the budget.
    pub hot_cap_ratio: u64,
}

impl GroupConfig {
    pub fn new(cache_bytes: u64) -> Self {
        Self {
            cache_bytes,
            hot_sample_rate: 0.1,
            hot_cap_ratio: 8,
        }
    }
}

/// Which of a group's two segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Keys this process owns under the consistent hash.
    Main,
    /// Mirrored keys owned by other peers.
    Hot,
}

/// A named cache namespace. Created through [`crate::Registry::add_group`]
/// and never destroyed for the life of the process.
pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    registry: Weak<RegistryInner>,
    config: GroupConfig,
    main_cache: SegmentCache,
    hot_cache: SegmentCache,
    flight: FlightGroup<ByteView>,
    stats: Stats,
}

impl Group {
    pub(crate) fn new(
        name: &str,
        config: GroupConfig,
        loader: Arc<dyn Loader>,
        registry: Weak<RegistryInner>,
    ) -> Self {
        Self {
            name: name.to_string(),
            loader,
            registry,
            config,
            main_cache: SegmentCache::new("main"),
            hot_cache: SegmentCache::new("hot"),
            flight: FlightGroup::new(),
            stats: Stats::default(),
        }
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group's counters.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Statistics for one of the group's segments.
    pub fn cache_stats(&self, kind: SegmentKind) -> CacheStats {
        match kind {
            SegmentKind::Main => self.main_cache.stats(),
            SegmentKind::Hot => self.hot_cache.stats(),
        }
    }

    /// Get the value for `key`, materializing it into `dest`.
    ///
    /// The lookup order is: local segments, then the key's owner over RPC,
    /// then the user loader. Concurrent misses for the same key share one
    /// load. Loader errors are returned verbatim and never cached.
    pub async fn get(
        &self,
        ctx: &CancellationToken,
        key: &str,
        dest: &mut dyn Sink,
    ) -> Result<(), Error> {
        self.stats.gets.increment();
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        if let Some(value) = self.lookup_cache(key) {
            self.stats.cache_hits.increment();
            tracing::trace!(group = %self.name, key, "cache hit");
            return dest.set_view(value);
        }

        // Track whether the loader already populated dest so the common
        // single-caller case skips a second materialization.
        let mut dest_populated = false;
        let value = self.load(ctx, key, dest, &mut dest_populated).await?;
        if dest_populated {
            return Ok(());
        }
        dest.set_view(value)
    }

    /// Load `key` by asking its owner or by invoking the local loader.
    async fn load(
        &self,
        ctx: &CancellationToken,
        key: &str,
        dest: &mut dyn Sink,
        dest_populated: &mut bool,
    ) -> Result<ByteView, Error> {
        self.stats.loads.increment();
        self.flight
            .work(ctx, key, async {
                self.stats.loads_deduped.increment();

                if let Some(peer) = self.pick_peer(key) {
                    match self.get_from_peer(ctx, peer.as_ref(), key).await {
                        Ok(value) => {
                            self.stats.peer_loads.increment();
                            return Ok(value);
                        }
                        Err(Error::Canceled) => return Err(Error::Canceled),
                        Err(err) => {
                            self.stats.peer_errors.increment();
                            tracing::debug!(
                                group = %self.name,
                                key,
                                %err,
                                "peer fetch failed, falling back to local load"
                            );
                        }
                    }
                }

                let value = match self.get_locally(ctx, key, dest).await {
                    Ok(value) => value,
                    Err(err) => {
                        self.stats.local_load_errs.increment();
                        return Err(err);
                    }
                };
                self.stats.local_loads.increment();
                // Only the flight leader reaches this point, so the flag
                // refers to this caller's own dest.
                *dest_populated = true;
                self.populate(key, value.clone(), SegmentKind::Main);
                Ok(value)
            })
            .await
    }

    async fn get_locally(
        &self,
        ctx: &CancellationToken,
        key: &str,
        dest: &mut dyn Sink,
    ) -> Result<ByteView, Error> {
        self.loader.load(ctx, key, dest).await?;
        dest.freeze()
    }

    async fn get_from_peer(
        &self,
        ctx: &CancellationToken,
        peer: &dyn PeerFetcher,
        key: &str,
    ) -> Result<ByteView, Error> {
        let req = GetRequest::new(self.name.clone(), key);
        let res = peer.fetch(ctx, &req).await?;
        let value = ByteView::from(res.value.unwrap_or_default());

        // TODO(wire): drive this off res.minute_qps instead of a fixed
        // sampling rate once peers report it.
        if rand::rng().random::<f64>() < self.config.hot_sample_rate {
            self.populate(key, value.clone(), SegmentKind::Hot);
        }
        Ok(value)
    }

    fn lookup_cache(&self, key: &str) -> Option<ByteView> {
        if self.config.cache_bytes == 0 {
            return None;
        }
        self.main_cache.get(key).or_else(|| self.hot_cache.get(key))
    }

    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>> {
        let registry = self.registry.upgrade()?;
        registry.picker()?.pick_peer(key)
    }

    fn populate(&self, key: &str, value: ByteView, kind: SegmentKind) {
        if self.config.cache_bytes == 0 {
            return;
        }
        let segment = match kind {
            SegmentKind::Main => &self.main_cache,
            SegmentKind::Hot => &self.hot_cache,
        };
        segment.add(key, value);

        // Evict until the combined budget holds again. The main segment is
        // the default victim; the hot segment is chosen once it grows past
        // its capped share.
        loop {
            let main_bytes = self.main_cache.bytes();
            let hot_bytes = self.hot_cache.bytes();
            if main_bytes + hot_bytes <= self.config.cache_bytes {
                return;
            }

            let victim = if hot_bytes > main_bytes / self.config.hot_cap_ratio.max(1) {
                &self.hot_cache
            } else {
                &self.main_cache
            };
            if !victim.remove_oldest() && !self.other(victim).remove_oldest() {
                return;
            }
        }
    }

    fn other<'a>(&'a self, segment: &SegmentCache) -> &'a SegmentCache {
        if std::ptr::eq(segment, &self.main_cache) {
            &self.hot_cache
        } else {
            &self.main_cache
        }
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache_bytes", &self.config.cache_bytes)
            .finish()
    }
}

/// One LRU segment plus byte accounting.
///
/// The LRU is serialized by the segment mutex; the counters are atomics so
/// stats reads and the eviction callback never contend on the lock.
struct SegmentCache {
    lru: Mutex<LruCache<String, ByteView>>,
    counters: Arc<SegmentCounters>,
}

#[derive(Default)]
struct SegmentCounters {
    nbytes: AtomicU64,
    ngets: AtomicU64,
    nhits: AtomicU64,
    nevict: AtomicU64,
}

fn charge(key: &str, value: &ByteView) -> u64 {
    (key.len() + value.len()) as u64
}

impl SegmentCache {
    fn new(name: &'static str) -> Self {
        let counters = Arc::new(SegmentCounters::default());
        let mut lru = LruCache::new(0);
        let evict_counters = counters.clone();
        lru.set_on_evict(Box::new(move |key: &String, value: &ByteView| {
            evict_counters
                .nbytes
                .fetch_sub(charge(key, value), Ordering::Relaxed);
            evict_counters.nevict.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(segment = name, key = key.as_str(), "evicted");
        }));
        Self {
            lru: Mutex::new(lru),
            counters,
        }
    }

    fn add(&self, key: &str, value: ByteView) {
        let new_charge = charge(key, &value);
        let mut lru = self.lru.lock();
        if let Some(old) = lru.add(key.to_string(), value) {
            self.counters
                .nbytes
                .fetch_sub(charge(key, &old), Ordering::Relaxed);
        }
        self.counters.nbytes.fetch_add(new_charge, Ordering::Relaxed);
    }

    fn get(&self, key: &str) -> Option<ByteView> {
        let mut lru = self.lru.lock();
        self.counters.ngets.fetch_add(1, Ordering::Relaxed);
        let value = lru.get(key).cloned();
        if value.is_some() {
            self.counters.nhits.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    fn remove_oldest(&self) -> bool {
        self.lru.lock().remove_oldest().is_some()
    }

    fn bytes(&self) -> u64 {
        self.counters.nbytes.load(Ordering::Relaxed)
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            bytes: self.bytes(),
            items: self.lru.lock().len() as u64,
            gets: self.counters.ngets.load(Ordering::Relaxed),
            hits: self.counters.nhits.load(Ordering::Relaxed),
            evictions: self.counters.nevict.load(Ordering::Relaxed),
        }
    }
}
