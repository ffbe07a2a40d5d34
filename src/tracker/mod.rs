//! # Bounded Top-K Tracker
//!
//! Tracks the keys seen among the last `cache_capacity` distinct keys, with an
//! accumulated count per key, and keeps an approximate leaderboard of the
//! `top_capacity` highest counts up to date on every event.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          TopTracker<W>                               │
//!   │                                                                      │
//!   │  index: HashTable<SlotId>   hash(slot key) ─► slot handle            │
//!   │                                                                      │
//!   │  slots: IntrusiveList<Slot<W>>  (fixed capacity Y, free list)        │
//!   │                                                                      │
//!   │    LRU ─► [ "10.0.0.1->10.0.0.9" | count 1500 | t=40 ]               │
//!   │           [ "10.0.0.7->10.0.0.2" | count   60 | t=41 ]               │
//!   │           [ "10.0.0.3->10.0.0.9" | count 9000 | t=44 ] ◄─ MRU        │
//!   │                                                                      │
//!   │  top: TopList (capacity X, ascending by (count, last_seen))          │
//!   │           [ s1 (60) | s0 (1500) | s2 (9000) ]                        │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Event Flow
//!
//! ```text
//!   record_event(key, t, w)
//!     │
//!     ├─ key indexed?  ── yes ─► move slot to MRU
//!     │        no
//!     │        ├─ free slot? ── yes ─► claim it, index key
//!     │        └─ cache full ───────► evict LRU slot: unindex, drop from
//!     │                               top list, reset storage in place
//!     │
//!     ├─ count += w.total(), totals += w, last_seen = max(last_seen, t)
//!     │
//!     └─ top list: admit if room or count >= min count; re-sort;
//!                  drop the lowest entry when over capacity
//! ```
//!
//! ## Approximation
//!
//! Eviction looks only at recency. A heavy key that stays quiet for
//! `cache_capacity` distinct keys loses its slot and its top list seat, and
//! restarts from zero when it reappears. The leaderboard is exact whenever
//! every key seen so far still fits in the cache.
//!
//! ## Core Operations
//!
//! | Method           | Complexity          | Description                       |
//! |------------------|---------------------|-----------------------------------|
//! | `try_new(y, x)`  | O(y)                | Reserve all storage up front      |
//! | `record_event`   | O(1) + O(x log x)   | Count one event                   |
//! | `top_n()`        | O(x)                | Leaderboard, leader first         |
//! | `all_entries()`  | O(y)                | Every tracked key, LRU first      |
//! | `get(key)`       | O(1)                | Lookup without touching recency   |

use std::borrow::Cow;
use std::fmt;
use std::hash::BuildHasher;

use hashbrown::HashTable;
use rustc_hash::FxBuildHasher;
use tracing::{debug, trace};

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;
#[cfg(feature = "metrics")]
use crate::ds::top_list::Offer;
use crate::ds::top_list::{Rank, TopList};
use crate::error::{ConfigError, InvariantError, RecordError};

#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::TrackerMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::TrackerMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{
    MetricsSnapshotProvider, TrackerMetricsReadRecorder, TrackerMetricsRecorder,
};

#[cfg(feature = "concurrency")]
pub mod concurrent;
pub mod weight;

#[cfg(feature = "concurrency")]
pub use concurrent::ConcurrentTopTracker;
pub use weight::{Directional, Weight};

/// Per-key record. Storage is reset in place when the slot is recycled.
#[derive(Debug)]
struct Slot<W> {
    key: Vec<u8>,
    count: u64,
    totals: W,
    last_seen: u64,
}

impl<W: Weight> Slot<W> {
    fn new(key: &[u8], timestamp: u64) -> Self {
        Self {
            key: key.to_vec(),
            count: 0,
            totals: W::default(),
            last_seen: timestamp,
        }
    }

    fn reset(&mut self, key: &[u8], timestamp: u64) {
        self.key.clear();
        self.key.extend_from_slice(key);
        self.count = 0;
        self.totals = W::default();
        self.last_seen = timestamp;
    }

    #[inline]
    fn apply(&mut self, timestamp: u64, weight: W) {
        self.count = self.count.saturating_add(weight.total());
        self.totals.accumulate(weight);
        if timestamp > self.last_seen {
            self.last_seen = timestamp;
        }
    }

    #[inline]
    fn rank(&self) -> Rank {
        Rank {
            count: self.count,
            last_seen: self.last_seen,
        }
    }

    fn entry(&self) -> TrackedEntry<'_, W> {
        TrackedEntry {
            key: &self.key,
            count: self.count,
            totals: self.totals,
            last_seen: self.last_seen,
        }
    }
}

#[inline]
fn rank_of<W: Weight>(slots: &IntrusiveList<Slot<W>>, id: SlotId) -> Rank {
    slots.get(id).map(Slot::rank).unwrap_or_default()
}

#[inline]
fn hash_key(hasher: &FxBuildHasher, key: &[u8]) -> u64 {
    hasher.hash_one(key)
}

#[inline]
fn slot_hash<W: Weight>(
    hasher: &FxBuildHasher,
    slots: &IntrusiveList<Slot<W>>,
    id: SlotId,
) -> u64 {
    slots.get(id).map_or(0, |slot| hash_key(hasher, &slot.key))
}

/// Read-only view of one tracked key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedEntry<'a, W> {
    pub key: &'a [u8],
    /// Sum of [`Weight::total`] over the key's events since it was last admitted.
    pub count: u64,
    /// Per-component sub-accumulators.
    pub totals: W,
    pub last_seen: u64,
}

impl<'a, W: Copy> TrackedEntry<'a, W> {
    /// Key rendered as text, with invalid UTF-8 replaced.
    pub fn key_str(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.key)
    }

    /// Copies the entry out of the tracker.
    pub fn into_owned(self) -> OwnedEntry<W> {
        OwnedEntry {
            key: self.key.to_vec(),
            count: self.count,
            totals: self.totals,
            last_seen: self.last_seen,
        }
    }
}

/// Owned copy of a [`TrackedEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedEntry<W> {
    pub key: Vec<u8>,
    pub count: u64,
    pub totals: W,
    pub last_seen: u64,
}

impl<W> OwnedEntry<W> {
    pub fn key_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

/// Fixed-memory tracker of the heaviest recently active keys.
///
/// `W` is the per-event [`Weight`]: `u64` for a single amount, or
/// [`Directional`] for traffic counted per direction.
///
/// # Example
///
/// ```
/// use flowtop::tracker::TopTracker;
///
/// let mut tracker: TopTracker<u64> = TopTracker::new(2, 1);
///
/// tracker.record_event("/index.html", 1, 500).unwrap();
/// tracker.record_event("/logo.png", 2, 9000).unwrap();
/// assert_eq!(tracker.top_n()[0].key, b"/logo.png");
///
/// // A third distinct key evicts the least recently used one.
/// tracker.record_event("/about", 3, 10).unwrap();
/// assert!(!tracker.contains("/index.html"));
/// assert_eq!(tracker.len(), 2);
/// ```
pub struct TopTracker<W: Weight = u64> {
    /// Hashes of the slots' own keys; a key's bytes live only in its slot.
    index: HashTable<SlotId>,
    hasher: FxBuildHasher,
    slots: IntrusiveList<Slot<W>>,
    top: TopList,
    #[cfg(feature = "metrics")]
    metrics: TrackerMetrics,
}

impl<W: Weight> TopTracker<W> {
    /// Creates a tracker remembering `cache_capacity` keys and ranking the
    /// top `top_capacity` of them.
    ///
    /// # Panics
    ///
    /// Panics if either capacity is zero or the storage cannot be reserved.
    /// See [`try_new`](Self::try_new).
    pub fn new(cache_capacity: usize, top_capacity: usize) -> Self {
        match Self::try_new(cache_capacity, top_capacity) {
            Ok(tracker) => tracker,
            Err(err) => panic!("invalid TopTracker configuration: {}", err),
        }
    }

    /// Creates a tracker, validating the configuration.
    ///
    /// All slot, index and top list storage is reserved here; recording
    /// events afterwards never grows it. A `top_capacity` larger than
    /// `cache_capacity` is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either capacity is zero or if the storage
    /// for `cache_capacity` slots cannot be allocated.
    pub fn try_new(cache_capacity: usize, top_capacity: usize) -> Result<Self, ConfigError> {
        if cache_capacity == 0 {
            return Err(ConfigError::new("cache capacity must be greater than zero"));
        }
        if top_capacity == 0 {
            return Err(ConfigError::new("top capacity must be greater than zero"));
        }

        let slots = IntrusiveList::try_with_capacity(cache_capacity).map_err(|err| {
            ConfigError::new(format!(
                "cannot reserve {} cache slots: {}",
                cache_capacity, err
            ))
        })?;
        // Twice the slots, so purging tombstones rehashes in place.
        let mut index = HashTable::new();
        index
            .try_reserve(cache_capacity.saturating_mul(2), |_: &SlotId| 0)
            .map_err(|err| {
                ConfigError::new(format!(
                    "cannot reserve index for {} keys: {:?}",
                    cache_capacity, err
                ))
            })?;
        let top = TopList::try_with_capacity(top_capacity).map_err(|err| {
            ConfigError::new(format!(
                "cannot reserve top list of {} entries: {}",
                top_capacity, err
            ))
        })?;

        debug!(cache_capacity, top_capacity, "top tracker created");

        Ok(Self {
            index,
            hasher: FxBuildHasher,
            slots,
            top,
            #[cfg(feature = "metrics")]
            metrics: TrackerMetrics::default(),
        })
    }

    /// Number of keys currently tracked.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns `true` once the next unseen key will evict the LRU key.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }

    /// Maximum number of keys tracked at once (Y).
    #[inline]
    pub fn cache_capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Maximum leaderboard length (X).
    #[inline]
    pub fn top_capacity(&self) -> usize {
        self.top.capacity()
    }

    fn find(&self, key: &[u8]) -> Option<SlotId> {
        let hash = hash_key(&self.hasher, key);
        let slots = &self.slots;
        self.index
            .find(hash, |&id| slots.get(id).is_some_and(|slot| slot.key == key))
            .copied()
    }

    /// Returns `true` if `key` is tracked. Does not touch recency.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.find(key.as_ref()).is_some()
    }

    /// Looks up a tracked key without touching recency.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<TrackedEntry<'_, W>> {
        let id = self.find(key.as_ref())?;
        self.slots.get(id).map(Slot::entry)
    }

    /// The key that the next unseen key would evict, if the cache is full.
    pub fn peek_lru(&self) -> Option<TrackedEntry<'_, W>> {
        if !self.slots.is_full() {
            return None;
        }
        let id = self.slots.front_id()?;
        self.slots.get(id).map(Slot::entry)
    }

    /// Counts one event of `weight` for `key` observed at `timestamp`.
    ///
    /// Timestamps only need to be non-decreasing per key; an older timestamp
    /// still adds its weight but leaves `last_seen` unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyKey`] for an empty key, leaving the
    /// tracker untouched. Every non-empty key is accepted.
    pub fn record_event(
        &mut self,
        key: impl AsRef<[u8]>,
        timestamp: u64,
        weight: W,
    ) -> Result<(), RecordError> {
        let key = key.as_ref();

        #[cfg(feature = "metrics")]
        self.metrics.record_event_call();

        if key.is_empty() {
            #[cfg(feature = "metrics")]
            self.metrics.record_empty_key();
            return Err(RecordError::EmptyKey);
        }

        let id = match self.find(key) {
            Some(id) => {
                #[cfg(feature = "metrics")]
                self.metrics.record_event_hit();
                self.slots.move_to_back(id);
                id
            },
            None => {
                #[cfg(feature = "metrics")]
                self.metrics.record_event_new();
                match self.claim_slot(key, timestamp) {
                    Some(id) => id,
                    None => {
                        debug_assert!(false, "no slot available with non-zero capacity");
                        return Ok(());
                    },
                }
            },
        };

        if let Some(slot) = self.slots.get_mut(id) {
            slot.apply(timestamp, weight);
        }
        self.maintain_top(id);
        Ok(())
    }

    /// Takes a free slot for `key`, or recycles the LRU slot when full.
    /// Neither path allocates once a recycled slot's key buffer is large
    /// enough.
    fn claim_slot(&mut self, key: &[u8], timestamp: u64) -> Option<SlotId> {
        let id = if self.slots.is_full() {
            let victim = self.slots.front_id()?;
            self.evict(victim);
            let slot = self.slots.get_mut(victim)?;
            slot.reset(key, timestamp);
            self.slots.move_to_back(victim);
            victim
        } else {
            self.slots.try_push_back(Slot::new(key, timestamp)).ok()?
        };
        let hash = hash_key(&self.hasher, key);
        let (hasher, slots) = (&self.hasher, &self.slots);
        self.index
            .insert_unique(hash, id, |&other| slot_hash(hasher, slots, other));
        Some(id)
    }

    /// Unlinks `victim` from the index and the top list. Its storage stays
    /// in the slot list for reuse.
    fn evict(&mut self, victim: SlotId) {
        let Some(slot) = self.slots.get(victim) else {
            return;
        };
        let hash = hash_key(&self.hasher, &slot.key);
        if let Ok(indexed) = self.index.find_entry(hash, |&id| id == victim) {
            indexed.remove();
        }
        let was_top = self.top.remove(victim);

        trace!(
            key = %String::from_utf8_lossy(&slot.key),
            count = slot.count,
            last_seen = slot.last_seen,
            was_top,
            "evicting least recently used key"
        );

        #[cfg(feature = "metrics")]
        {
            self.metrics.record_eviction();
            if was_top {
                self.metrics.record_evicted_from_top();
            }
        }
    }

    fn maintain_top(&mut self, id: SlotId) {
        let slots = &self.slots;
        let _offer = self.top.offer(id, |other| rank_of(slots, other));

        #[cfg(feature = "metrics")]
        self.record_offer(id, _offer);
    }

    #[cfg(feature = "metrics")]
    fn record_offer(&mut self, id: SlotId, offer: Offer) {
        if let Offer::Admitted { displaced } = offer {
            if displaced != Some(id) {
                self.metrics.record_top_admission();
            }
            if displaced.is_some_and(|other| other != id) {
                self.metrics.record_top_displacement();
            }
        }
    }

    /// Current leaderboard, highest `(count, last_seen)` first.
    ///
    /// At most `top_capacity` entries, all of them currently tracked.
    pub fn top_n(&self) -> Vec<TrackedEntry<'_, W>> {
        #[cfg(feature = "metrics")]
        self.metrics.record_top_n_call();

        self.iter_top().collect()
    }

    /// Lazy form of [`top_n`](Self::top_n).
    pub fn iter_top(&self) -> impl Iterator<Item = TrackedEntry<'_, W>> + '_ {
        self.top
            .iter()
            .rev()
            .filter_map(|&id| self.slots.get(id).map(Slot::entry))
    }

    /// Every tracked key, least recently used first.
    pub fn all_entries(&self) -> Vec<TrackedEntry<'_, W>> {
        #[cfg(feature = "metrics")]
        self.metrics.record_all_entries_call();

        self.slots
            .iter_entries()
            .map(|(_, slot)| slot.entry())
            .collect()
    }

    /// Forgets every key. Reserved storage is kept.
    pub fn clear(&mut self) {
        debug!(dropped = self.slots.len(), "top tracker cleared");
        self.index.clear();
        self.slots.clear();
        self.top.clear();

        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }

    /// Verifies that the index, slot list and top list agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.slots.len() > self.slots.capacity() {
            return Err(InvariantError::new(format!(
                "{} slots occupied but capacity is {}",
                self.slots.len(),
                self.slots.capacity()
            )));
        }
        if self.index.len() != self.slots.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but {} slots are occupied",
                self.index.len(),
                self.slots.len()
            )));
        }

        let mut walked = 0usize;
        let mut prev = None;
        for (id, slot) in self.slots.iter_entries() {
            walked += 1;
            if slot.key.is_empty() {
                return Err(InvariantError::new(format!("slot {:?} has an empty key", id)));
            }
            match self.find(&slot.key) {
                Some(indexed) if indexed == id => {},
                other => {
                    return Err(InvariantError::new(format!(
                        "key {:?} in slot {:?} indexed as {:?}",
                        String::from_utf8_lossy(&slot.key),
                        id,
                        other
                    )));
                },
            }
            prev = Some(id);
        }
        if walked != self.slots.len() {
            return Err(InvariantError::new(format!(
                "recency walk visited {} slots but {} are occupied",
                walked,
                self.slots.len()
            )));
        }
        if prev != self.slots.back_id() {
            return Err(InvariantError::new("recency walk did not end at the MRU slot"));
        }

        if self.top.len() > self.top.capacity() {
            return Err(InvariantError::new(format!(
                "top list holds {} entries but capacity is {}",
                self.top.len(),
                self.top.capacity()
            )));
        }
        let mut listed: Vec<SlotId> = Vec::with_capacity(self.top.len());
        for &id in self.top.iter() {
            if !self.slots.contains(id) {
                return Err(InvariantError::new(format!(
                    "top list references vacant slot {:?}",
                    id
                )));
            }
            if listed.contains(&id) {
                return Err(InvariantError::new(format!(
                    "top list references slot {:?} twice",
                    id
                )));
            }
            listed.push(id);
        }
        if !self.top.is_sorted_by_rank(|id| rank_of(&self.slots, id)) {
            return Err(InvariantError::new("top list is not sorted by rank"));
        }

        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.slots.debug_validate_invariants();
        if let Err(err) = self.check_invariants() {
            panic!("{}", err);
        }
    }
}

#[cfg(feature = "metrics")]
impl<W: Weight> TopTracker<W> {
    pub fn metrics_snapshot(&self) -> TrackerMetricsSnapshot {
        TrackerMetricsSnapshot {
            record_calls: self.metrics.record_calls,
            record_hits: self.metrics.record_hits,
            record_new: self.metrics.record_new,
            empty_keys: self.metrics.empty_keys,
            evictions: self.metrics.evictions,
            evicted_from_top: self.metrics.evicted_from_top,
            top_admissions: self.metrics.top_admissions,
            top_displacements: self.metrics.top_displacements,
            top_n_calls: self.metrics.top_n_calls.get(),
            all_entries_calls: self.metrics.all_entries_calls.get(),
            clears: self.metrics.clears,
            cache_len: self.slots.len(),
            cache_capacity: self.slots.capacity(),
            top_len: self.top.len(),
            top_capacity: self.top.capacity(),
        }
    }
}

#[cfg(feature = "metrics")]
impl<W: Weight> MetricsSnapshotProvider<TrackerMetricsSnapshot> for TopTracker<W> {
    fn snapshot(&self) -> TrackerMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<W: Weight> fmt::Debug for TopTracker<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopTracker")
            .field("len", &self.len())
            .field("cache_capacity", &self.cache_capacity())
            .field("top_len", &self.top.len())
            .field("top_capacity", &self.top_capacity())
            .finish_non_exhaustive()
    }
}
