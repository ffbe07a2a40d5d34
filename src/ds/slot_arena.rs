//! Fixed-capacity slot arena with an index free list.
//!
//! Every slot is created vacant at construction and its index pushed onto the
//! free list, so the arena never reallocates after `with_capacity`. Handles
//! are plain indices ([`SlotId`]) and stay valid until [`SlotArena::clear`].
//! Occupied slots are recycled in place through `get_mut`.

use std::collections::TryReserveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<Option<T>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> SlotArena<T> {
    /// Creates an arena holding at most `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if the allocator cannot provide storage for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(arena) => arena,
            Err(err) => panic!("slot arena of {} slots: {}", capacity, err),
        }
    }

    /// Creates an arena holding at most `capacity` values, reporting
    /// allocation failure instead of aborting.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize_with(capacity, || None);

        let mut free_list = Vec::new();
        free_list.try_reserve_exact(capacity)?;
        // Reversed so the lowest index is handed out first.
        free_list.extend((0..capacity).rev());

        Ok(Self {
            slots,
            free_list,
            len: 0,
        })
    }

    /// Stores `value` in a free slot, or hands it back when the arena is full.
    pub fn try_insert(&mut self, value: T) -> Result<SlotId, T> {
        let Some(idx) = self.free_list.pop() else {
            return Err(value);
        };
        self.slots[idx] = Some(value);
        self.len += 1;
        Ok(SlotId(idx))
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.slots
            .get(id.0)
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` when no free slot remains.
    pub fn is_full(&self) -> bool {
        self.free_list.is_empty()
    }

    /// Fixed number of slots chosen at construction.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Vacates every slot without releasing storage.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.free_list.clear();
        self.free_list.extend((0..self.slots.len()).rev());
        self.len = 0;
    }
}
