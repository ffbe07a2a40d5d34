//! Bounded leaderboard of slot handles kept in ascending rank order.
//!
//! The list never owns the ranked data; callers pass a lookup closure that
//! maps a [`SlotId`] to its current [`Rank`]. After a ranked value changes the
//! caller offers its handle again and the list moves it into place. Only one
//! rank may change between offers.
//!
//! ```text
//!   ids (ascending):  [ s7 (3, t=10) | s2 (3, t=12) | s9 (8, t=4) ]
//!                       ▲ min: dropped first          ▲ leader
//! ```
//!
//! Admission only looks at `count`: a candidate enters when the list has room
//! or its count is at least the minimum's count. The `last_seen` tie-break
//! then decides which equal-count entry falls off.

use std::collections::TryReserveError;

use crate::ds::slot_arena::SlotId;

/// Sort key of a ranked slot: `count` first, then `last_seen`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank {
    pub count: u64,
    pub last_seen: u64,
}

/// Outcome of [`TopList::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// The candidate ranked below the current minimum of a full list.
    Rejected,
    /// The candidate was already listed and has been repositioned.
    Refreshed,
    /// The candidate was appended; `displaced` is the entry dropped to stay
    /// within capacity, which may be the candidate itself.
    Admitted { displaced: Option<SlotId> },
}

#[derive(Debug)]
pub struct TopList {
    ids: Vec<SlotId>,
    capacity: usize,
}

impl TopList {
    /// Creates an empty list holding at most `capacity` handles.
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(list) => list,
            Err(err) => panic!("top list of {} entries: {}", capacity, err),
        }
    }

    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut ids = Vec::new();
        // One spare slot for the transient overflow inside `offer`.
        ids.try_reserve_exact(capacity.saturating_add(1))?;
        Ok(Self { ids, capacity })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lowest-ranked handle, the first to be dropped.
    pub fn min(&self) -> Option<SlotId> {
        self.ids.first().copied()
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns `true` if a slot ranked at `rank` qualifies for the list.
    pub fn admits<F>(&self, rank: Rank, rank_of: F) -> bool
    where
        F: Fn(SlotId) -> Rank,
    {
        if self.ids.len() < self.capacity {
            return true;
        }
        match self.min() {
            Some(min) => rank.count >= rank_of(min).count,
            // Zero capacity: nothing is ever admitted.
            None => false,
        }
    }

    /// Offers `id` after its rank changed.
    pub fn offer<F>(&mut self, id: SlotId, rank_of: F) -> Offer
    where
        F: Fn(SlotId) -> Rank,
    {
        if !self.admits(rank_of(id), &rank_of) {
            return Offer::Rejected;
        }

        // The others keep their ranks, so the rest of the list stays sorted.
        let listed = self.remove(id);
        let rank = rank_of(id);
        let at = self.ids.partition_point(|&other| rank_of(other) <= rank);
        self.ids.insert(at, id);

        if listed {
            return Offer::Refreshed;
        }
        let displaced = if self.ids.len() > self.capacity {
            Some(self.ids.remove(0))
        } else {
            None
        };
        Offer::Admitted { displaced }
    }

    /// Removes `id` if listed, preserving the order of the others.
    pub fn remove(&mut self, id: SlotId) -> bool {
        match self.ids.iter().position(|&other| other == id) {
            Some(pos) => {
                self.ids.remove(pos);
                true
            },
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Handles in ascending rank order; `.rev()` yields the leader first.
    pub fn iter(&self) -> std::slice::Iter<'_, SlotId> {
        self.ids.iter()
    }

    /// Returns `true` if the handles are in ascending rank order.
    pub fn is_sorted_by_rank<F>(&self, rank_of: F) -> bool
    where
        F: Fn(SlotId) -> Rank,
    {
        self.ids
            .windows(2)
            .all(|pair| rank_of(pair[0]) <= rank_of(pair[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(table: &[(u64, u64)]) -> impl Fn(SlotId) -> Rank + '_ {
        move |id| {
            let (count, last_seen) = table[id.index()];
            Rank { count, last_seen }
        }
    }

    fn order(list: &TopList) -> Vec<usize> {
        list.iter().map(|id| id.index()).collect()
    }

    #[test]
    fn rank_orders_by_count_then_last_seen() {
        let older = Rank { count: 5, last_seen: 1 };
        let newer = Rank { count: 5, last_seen: 2 };
        let bigger = Rank { count: 6, last_seen: 0 };
        assert!(older < newer);
        assert!(newer < bigger);
    }

    #[test]
    fn offer_fills_list_then_keeps_sorted() {
        let table = [(4, 1), (9, 2), (1, 3)];
        let mut list = TopList::with_capacity(3);
        for idx in 0..3 {
            let offer = list.offer(SlotId(idx), ranks(&table));
            assert_eq!(offer, Offer::Admitted { displaced: None });
        }
        assert_eq!(order(&list), vec![2, 0, 1]);
        assert_eq!(list.min(), Some(SlotId(2)));
    }

    #[test]
    fn offer_displaces_minimum_when_full() {
        let table = [(4, 1), (9, 2), (5, 3)];
        let mut list = TopList::with_capacity(2);
        list.offer(SlotId(0), ranks(&table));
        list.offer(SlotId(1), ranks(&table));

        let offer = list.offer(SlotId(2), ranks(&table));
        assert_eq!(offer, Offer::Admitted { displaced: Some(SlotId(0)) });
        assert_eq!(order(&list), vec![2, 1]);
    }

    #[test]
    fn offer_rejects_below_minimum() {
        let table = [(4, 1), (9, 2), (3, 9)];
        let mut list = TopList::with_capacity(2);
        list.offer(SlotId(0), ranks(&table));
        list.offer(SlotId(1), ranks(&table));

        assert_eq!(list.offer(SlotId(2), ranks(&table)), Offer::Rejected);
        assert_eq!(order(&list), vec![0, 1]);
    }

    #[test]
    fn equal_count_with_older_last_seen_falls_off() {
        // Slot 2 ties the minimum's count but is older, so it is admitted
        // and immediately dropped again.
        let table = [(4, 5), (9, 2), (4, 1)];
        let mut list = TopList::with_capacity(2);
        list.offer(SlotId(0), ranks(&table));
        list.offer(SlotId(1), ranks(&table));

        let offer = list.offer(SlotId(2), ranks(&table));
        assert_eq!(offer, Offer::Admitted { displaced: Some(SlotId(2)) });
        assert_eq!(order(&list), vec![0, 1]);
    }

    #[test]
    fn refresh_repositions_without_duplicates() {
        let mut table = vec![(4, 1), (9, 2)];
        let mut list = TopList::with_capacity(2);
        list.offer(SlotId(0), ranks(&table));
        list.offer(SlotId(1), ranks(&table));

        table[0] = (12, 3);
        assert_eq!(list.offer(SlotId(0), ranks(&table)), Offer::Refreshed);
        assert_eq!(order(&list), vec![1, 0]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let table = [(1, 0), (2, 0), (3, 0)];
        let mut list = TopList::with_capacity(3);
        for idx in 0..3 {
            list.offer(SlotId(idx), ranks(&table));
        }
        assert!(list.remove(SlotId(1)));
        assert!(!list.remove(SlotId(1)));
        assert_eq!(order(&list), vec![0, 2]);
        assert!(list.is_sorted_by_rank(ranks(&table)));
    }

    #[test]
    fn offers_stay_within_reserved_storage() {
        let mut table: Vec<(u64, u64)> = (0..16).map(|i| (i % 5, i)).collect();
        let mut list = TopList::with_capacity(4);
        let reserved = list.ids.capacity();
        for round in 0..64u64 {
            let idx = (round as usize * 7) % table.len();
            table[idx].0 += round;
            table[idx].1 = 100 + round;
            list.offer(SlotId(idx), ranks(&table));
            assert!(list.is_sorted_by_rank(ranks(&table)));
        }
        assert_eq!(list.len(), 4);
        assert_eq!(list.ids.capacity(), reserved);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let table = [(100, 0)];
        let mut list = TopList::with_capacity(0);
        assert_eq!(list.offer(SlotId(0), ranks(&table)), Offer::Rejected);
        assert!(list.is_empty());
    }
}
