//! Error types for the flowtop library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when tracker configuration parameters are
//!   invalid (zero capacity) or their storage cannot be reserved.
//! - [`RecordError`]: Returned when an event violates the input contract of
//!   [`TopTracker::record_event`](crate::tracker::TopTracker::record_event).
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (`check_invariants` methods).
//!
//! ## Example Usage
//!
//! ```
//! use flowtop::error::{ConfigError, RecordError};
//! use flowtop::tracker::TopTracker;
//!
//! // Fallible constructor for user-configurable parameters
//! let tracker: Result<TopTracker<u64>, ConfigError> = TopTracker::try_new(1000, 10);
//! assert!(tracker.is_ok());
//!
//! // Zero capacity is caught without panicking
//! assert!(TopTracker::<u64>::try_new(0, 10).is_err());
//!
//! // Empty keys are rejected and leave the tracker untouched
//! let mut tracker: TopTracker<u64> = TopTracker::new(4, 2);
//! assert_eq!(tracker.record_event("", 1, 5), Err(RecordError::EmptyKey));
//! assert!(tracker.is_empty());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal tracker invariants are violated.
///
/// Produced by [`TopTracker::check_invariants`](crate::tracker::TopTracker::check_invariants).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when tracker configuration parameters are invalid.
///
/// Produced by [`TopTracker::try_new`](crate::tracker::TopTracker::try_new).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use flowtop::tracker::TopTracker;
///
/// let err = TopTracker::<u64>::try_new(0, 10).unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// RecordError
// ---------------------------------------------------------------------------

/// Error returned by [`TopTracker::record_event`](crate::tracker::TopTracker::record_event).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// The event key was empty. The tracker state is unchanged.
    EmptyKey,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::EmptyKey => f.write_str("event key must not be empty"),
        }
    }
}

impl std::error::Error for RecordError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
