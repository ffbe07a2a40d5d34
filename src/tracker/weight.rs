//! Per-event weights accepted by [`TopTracker`](crate::tracker::TopTracker).
//!
//! A weight is both the amount added by one event and the sub-accumulator a
//! slot keeps for it. Ranking only ever uses [`Weight::total`], so variants
//! with several accumulators still compete on a single `count`.

/// Amount recorded by a single event.
pub trait Weight: Copy + Default {
    /// Contribution of this weight to the ranking count.
    fn total(&self) -> u64;

    /// Adds `other` into `self`, saturating per component.
    fn accumulate(&mut self, other: Self);
}

/// Single amount per event, for example bytes per request keyed by URI.
impl Weight for u64 {
    #[inline]
    fn total(&self) -> u64 {
        *self
    }

    #[inline]
    fn accumulate(&mut self, other: Self) {
        *self = self.saturating_add(other);
    }
}

/// Traffic between two endpoints A and B, counted per direction.
///
/// Both directions roll into the ranking count; the split is kept for display.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Directional {
    /// A to B.
    pub forward: u64,
    /// B to A.
    pub reverse: u64,
}

impl Directional {
    pub fn new(forward: u64, reverse: u64) -> Self {
        Self { forward, reverse }
    }

    pub fn forward_only(amount: u64) -> Self {
        Self::new(amount, 0)
    }

    pub fn reverse_only(amount: u64) -> Self {
        Self::new(0, amount)
    }
}

impl Weight for Directional {
    #[inline]
    fn total(&self) -> u64 {
        self.forward.saturating_add(self.reverse)
    }

    #[inline]
    fn accumulate(&mut self, other: Self) {
        self.forward = self.forward.saturating_add(other.forward);
        self.reverse = self.reverse.saturating_add(other.reverse);
    }
}
