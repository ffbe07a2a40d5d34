//! Shared-access wrapper around [`TopTracker`].
//!
//! Every operation takes the lock once, so each `record_event` is atomic
//! with respect to readers. Reads copy entries out before releasing the lock.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ConfigError, InvariantError, RecordError};
use crate::tracker::{OwnedEntry, TopTracker, TrackedEntry, Weight};

/// Thread-safe [`TopTracker`] handle. Clones share the same tracker.
///
/// # Example
///
/// ```
/// use flowtop::tracker::ConcurrentTopTracker;
/// use std::thread;
///
/// let tracker: ConcurrentTopTracker<u64> = ConcurrentTopTracker::new(64, 4);
/// let handles: Vec<_> = (0..4)
///     .map(|worker| {
///         let tracker = tracker.clone();
///         thread::spawn(move || {
///             for i in 0..10u64 {
///                 tracker.record_event(format!("k{}", worker), i, 1).unwrap();
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(tracker.top_n().len(), 4);
/// assert!(tracker.top_n().iter().all(|entry| entry.count == 10));
/// ```
#[derive(Clone)]
pub struct ConcurrentTopTracker<W: Weight = u64> {
    inner: Arc<RwLock<TopTracker<W>>>,
}

impl<W: Weight> ConcurrentTopTracker<W> {
    /// # Panics
    ///
    /// Panics on the same configurations as [`TopTracker::new`].
    pub fn new(cache_capacity: usize, top_capacity: usize) -> Self {
        Self::from_tracker(TopTracker::new(cache_capacity, top_capacity))
    }

    pub fn try_new(cache_capacity: usize, top_capacity: usize) -> Result<Self, ConfigError> {
        TopTracker::try_new(cache_capacity, top_capacity).map(Self::from_tracker)
    }

    /// Wraps an existing tracker, keeping its state.
    pub fn from_tracker(tracker: TopTracker<W>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tracker)),
        }
    }

    pub fn record_event(
        &self,
        key: impl AsRef<[u8]>,
        timestamp: u64,
        weight: W,
    ) -> Result<(), RecordError> {
        let mut tracker = self.inner.write();
        tracker.record_event(key, timestamp, weight)
    }

    /// Leaderboard, highest first, copied out of the lock.
    pub fn top_n(&self) -> Vec<OwnedEntry<W>> {
        let tracker = self.inner.read();
        tracker
            .top_n()
            .into_iter()
            .map(TrackedEntry::into_owned)
            .collect()
    }

    /// Every tracked key, least recently used first.
    pub fn all_entries(&self) -> Vec<OwnedEntry<W>> {
        let tracker = self.inner.read();
        tracker
            .all_entries()
            .into_iter()
            .map(TrackedEntry::into_owned)
            .collect()
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<OwnedEntry<W>> {
        let tracker = self.inner.read();
        tracker.get(key).map(TrackedEntry::into_owned)
    }

    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.inner.read().contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn cache_capacity(&self) -> usize {
        self.inner.read().cache_capacity()
    }

    pub fn top_capacity(&self) -> usize {
        self.inner.read().top_capacity()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.read().check_invariants()
    }

    /// Runs `f` with shared access to the tracker.
    pub fn with_read<R>(&self, f: impl FnOnce(&TopTracker<W>) -> R) -> R {
        let tracker = self.inner.read();
        f(&tracker)
    }
}

#[cfg(feature = "metrics")]
impl<W: Weight> ConcurrentTopTracker<W> {
    pub fn metrics_snapshot(&self) -> crate::metrics::snapshot::TrackerMetricsSnapshot {
        self.inner.read().metrics_snapshot()
    }
}

impl<W: Weight> fmt::Debug for ConcurrentTopTracker<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracker = self.inner.read();
        f.debug_struct("ConcurrentTopTracker")
            .field("len", &tracker.len())
            .field("cache_capacity", &tracker.cache_capacity())
            .field("top_capacity", &tracker.top_capacity())
            .finish_non_exhaustive()
    }
}
