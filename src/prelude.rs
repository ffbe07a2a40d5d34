pub use crate::ds::{IntrusiveList, SlotArena, SlotId, TopList};
pub use crate::error::{ConfigError, InvariantError, RecordError};
pub use crate::tracker::{Directional, OwnedEntry, TopTracker, TrackedEntry, Weight};

#[cfg(feature = "concurrency")]
pub use crate::tracker::ConcurrentTopTracker;
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::TrackerMetricsSnapshot;
