use std::any::type_name;

use crate::builder::Constructor;
use crate::{FreeMap, Recyclable};

/// One fixed-capacity block of a [`ChainedPool`][crate::ChainedPool].
///
/// The slots are allocated once when the block is created and never move afterwards, so
/// references obtained from a block stay at the same address for as long as the block exists.
pub(crate) struct Block<T> {
    slots: Box<[BlockSlot<T>]>,

    free_map: FreeMap,

    /// The number of occupied slots.
    count: usize,
}

struct BlockSlot<T> {
    value: T,
    used_before: bool,
}

impl<T: Recyclable> Block<T> {
    /// Creates a block, running the constructor over every slot.
    ///
    /// Returns `None` if the slot storage cannot be allocated.
    #[must_use]
    pub(crate) fn try_new(capacity: usize, constructor: &Constructor<T>) -> Option<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).ok()?;
        slots.extend((0..capacity).map(|_| BlockSlot {
            value: constructor(),
            used_before: false,
        }));

        Some(Self {
            slots: slots.into_boxed_slice(),
            free_map: FreeMap::new(capacity),
            count: 0,
        })
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub(crate) fn is_full(&self) -> bool {
        self.count >= self.slots.len()
    }

    /// Occupies the lowest vacant slot and returns its index, or `None` if the block is full.
    pub(crate) fn acquire(&mut self) -> Option<usize> {
        let index = self.free_map.first_free()?;

        let slot = self
            .slots
            .get_mut(index)
            .expect("free map and slots cover the same indexes");

        if slot.used_before {
            slot.value.reset();
        }

        slot.used_before = true;

        self.free_map.mark_occupied(index);
        self.count = self
            .count
            .checked_add(1)
            .expect("guarded by the free map having a vacant slot");

        Some(index)
    }

    /// # Panics
    ///
    /// Panics if the slot is out of bounds or vacant.
    pub(crate) fn release(&mut self, index: usize) {
        assert!(
            self.free_map.is_occupied(index),
            "release({index}) slot was vacant in block of {}",
            type_name::<T>()
        );

        self.free_map.mark_free(index);
        self.count = self
            .count
            .checked_sub(1)
            .expect("we asserted above that the slot is occupied so count must be non-zero");
    }

    /// Releases every occupied slot and returns how many there were.
    pub(crate) fn release_all(&mut self) -> usize {
        let released = self.count;

        for index in 0..self.slots.len() {
            self.free_map.mark_free(index);
        }

        self.count = 0;
        released
    }

    #[must_use]
    pub(crate) fn is_occupied(&self, index: usize) -> bool {
        self.free_map.is_occupied(index)
    }

    /// # Panics
    ///
    /// Panics if the slot is out of bounds or vacant.
    #[must_use]
    pub(crate) fn get(&self, index: usize) -> &T {
        assert!(
            self.free_map.is_occupied(index),
            "get({index}) slot was vacant in block of {}",
            type_name::<T>()
        );

        &self
            .slots
            .get(index)
            .expect("occupied slots are in bounds")
            .value
    }

    /// # Panics
    ///
    /// Panics if the slot is out of bounds or vacant.
    #[must_use]
    pub(crate) fn get_mut(&mut self, index: usize) -> &mut T {
        assert!(
            self.free_map.is_occupied(index),
            "get_mut({index}) slot was vacant in block of {}",
            type_name::<T>()
        );

        &mut self
            .slots
            .get_mut(index)
            .expect("occupied slots are in bounds")
            .value
    }

    /// Invokes the teardown hook on every slot.
    pub(crate) fn release_values(&mut self) {
        for slot in &mut self.slots {
            slot.value.release();
        }
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let observed = self.free_map.count_occupied();

        assert!(
            self.count == observed,
            "block count {} does not match the observed occupied count {observed} in block of {}",
            self.count,
            type_name::<T>()
        );
    }
}
