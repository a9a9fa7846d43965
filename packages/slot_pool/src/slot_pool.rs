use std::any::type_name;
use std::fmt;
use std::thread;

use tracing::{debug, trace};

use crate::builder::Constructor;
use crate::error::Result;
use crate::{DropPolicy, FreeMap, Handle, PoolBuilder, PoolError, Recyclable, ReferenceTracker};

/// Handles encode the slot index as `u32`, which caps the size of a pool.
const MAX_SLOTS: usize = u32::MAX as usize;

/// A pool of fixed-size records that doubles its storage when full, addressed by [`Handle`].
///
/// Records are acquired from the lowest-indexed vacant slot, filled in place and later
/// released, either one at a time or all together with [`release_all()`][1]. Slots are
/// constructed once and then reused, with [`Recyclable::reset()`] clearing a slot's previous
/// content when it is handed out again.
///
/// # Growth and handle stability
///
/// When every slot is occupied, the next acquire doubles the capacity of the pool. The backing
/// storage may move to a new location as part of this, so the pool never gives out long-lived
/// references. It gives out handles instead, which hold the slot index and remain valid across
/// any number of growth events until the slot is released. A handle used after its slot was
/// released is detected through a generation check and causes a panic.
///
/// # Referees
///
/// A slot may be acquired on behalf of a named referee via [`acquire_tracked()`][2]. The pool
/// remembers the referee until the slot is released and reports it via [`referee_of()`][3].
///
/// # Thread safety
///
/// The pool is `Send` if `T` is, but never `Sync`. Each thread that needs a pool creates its own.
///
/// # Examples
///
/// ```
/// use slot_pool::SlotPool;
///
/// let mut pool = SlotPool::<String>::builder().initial_capacity(1).build();
///
/// let greeting = pool.acquire().unwrap();
/// pool.get_mut(greeting).push_str("hello");
///
/// // These force the pool to grow (and relocate) several times.
/// let others: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();
/// assert_eq!(pool.capacity(), 16);
///
/// // The original handle still reaches the original record.
/// assert_eq!(pool.get(greeting), "hello");
///
/// assert_eq!(pool.release_all(), 1 + others.len());
/// assert!(pool.is_empty());
/// ```
///
/// [1]: Self::release_all
/// [2]: Self::acquire_tracked
/// [3]: Self::referee_of
pub struct SlotPool<T: Recyclable> {
    /// One entry per slot. The length of this is the capacity of the pool.
    slots: Vec<Slot<T>>,

    free_map: FreeMap,

    /// Invariant: equal to the number of set bits in `free_map`.
    used_count: usize,

    tracker: ReferenceTracker,

    constructor: Constructor<T>,

    max_capacity: Option<usize>,

    growth_events: usize,

    drop_policy: DropPolicy,
}

struct Slot<T> {
    value: T,

    /// Bumped every time the slot is released.
    generation: u32,

    /// Whether the slot has ever been acquired. Only reused slots are reset.
    used_before: bool,
}

impl<T> Slot<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            generation: 0,
            used_before: false,
        }
    }
}

impl<T: Recyclable + Default + 'static> SlotPool<T> {
    /// Creates a new pool with the default configuration, constructing slots via `T::default()`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new pool that constructs slots via `T::default()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::{DropPolicy, SlotPool};
    ///
    /// let pool = SlotPool::<u32>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    ///
    /// assert!(pool.is_empty());
    /// ```
    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new(T::default)
    }
}

impl<T: Recyclable + Default + 'static> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Recyclable> SlotPool<T> {
    /// Starts building a new pool that constructs slots with a custom function.
    pub fn builder_with<F>(constructor: F) -> PoolBuilder<T>
    where
        F: Fn() -> T + Send + 'static,
    {
        PoolBuilder::new(constructor)
    }

    #[must_use]
    pub(crate) fn new_inner(
        constructor: Constructor<T>,
        capacity: usize,
        max_capacity: Option<usize>,
        drop_policy: DropPolicy,
    ) -> Self {
        assert!(
            capacity <= MAX_SLOTS,
            "pool of {} cannot start with {capacity} slots",
            type_name::<T>()
        );

        let slots = (0..capacity).map(|_| Slot::new(constructor())).collect();

        Self {
            slots,
            free_map: FreeMap::new(capacity),
            used_count: 0,
            tracker: ReferenceTracker::new(capacity),
            constructor,
            max_capacity,
            growth_events: 0,
            drop_policy,
        }
    }

    /// The number of slots in the pool, occupied or not.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The number of occupied slots.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn used_count(&self) -> usize {
        self.used_count
    }

    /// Whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used_count == 0
    }

    /// How many times the pool has grown since it was created.
    #[must_use]
    pub fn growth_events(&self) -> usize {
        self.growth_events
    }

    /// Acquires the lowest-indexed vacant slot, growing the pool if there is none.
    ///
    /// If the slot held a previous record, its value is [reset][Recyclable::reset] first.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AllocationExhausted`] if the pool is full and cannot grow, either
    /// because of its maximum capacity or because memory could not be obtained. The pool is
    /// unchanged in that case.
    pub fn acquire(&mut self) -> Result<Handle> {
        self.acquire_inner(None)
    }

    /// Acquires a slot like [`acquire()`][Self::acquire] and records `referee` as its holder.
    ///
    /// The referee is remembered until the slot is released.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AllocationExhausted`] if the pool is full and cannot grow.
    pub fn acquire_tracked(&mut self, referee: &'static str) -> Result<Handle> {
        self.acquire_inner(Some(referee))
    }

    fn acquire_inner(&mut self, referee: Option<&'static str>) -> Result<Handle> {
        #[cfg(debug_assertions)]
        self.integrity_check();

        let index = if let Some(index) = self.free_map.first_free() {
            index
        } else {
            self.grow()?;

            self.free_map
                .first_free()
                .expect("growth always adds vacant slots")
        };

        let slot = self
            .slots
            .get_mut(index)
            .expect("free map and slots cover the same indexes");

        if slot.used_before {
            slot.value.reset();
        }

        slot.used_before = true;
        let handle = Handle::new(index, slot.generation);

        self.free_map.mark_occupied(index);
        self.tracker.record(index, referee);
        self.used_count = self
            .used_count
            .checked_add(1)
            .expect("guarded by MAX_SLOTS capacity limit");

        trace!(pool = type_name::<T>(), %handle, referee, "slot acquired");

        Ok(handle)
    }

    /// Releases an occupied slot back to the pool.
    ///
    /// The value in the slot is left as it is until the slot is acquired again.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to an occupied slot, including when the slot it
    /// referred to has already been released.
    pub fn release(&mut self, handle: Handle) {
        assert!(
            self.is_occupied(handle),
            "release({handle}) handle does not refer to an occupied slot in pool of {}",
            type_name::<T>()
        );

        self.release_index(handle.index());
    }

    /// Releases every occupied slot, sweeping in index order. Returns how many were released.
    ///
    /// All handles issued before the call become stale. The next acquire returns index 0.
    pub fn release_all(&mut self) -> usize {
        let mut released: usize = 0;

        for index in 0..self.capacity() {
            if self.free_map.is_occupied(index) {
                if let Some(referee) = self.tracker.referee(index) {
                    trace!(pool = type_name::<T>(), index, referee, "releasing tracked slot");
                }

                self.release_index(index);
                released = released
                    .checked_add(1)
                    .expect("cannot release more slots than exist");
            }
        }

        debug!(pool = type_name::<T>(), released, "released all occupied slots");

        released
    }

    fn release_index(&mut self, index: usize) {
        self.free_map.mark_free(index);
        self.tracker.forget(index);

        let slot = self
            .slots
            .get_mut(index)
            .expect("free map and slots cover the same indexes");
        slot.generation = slot.generation.wrapping_add(1);

        self.used_count = self
            .used_count
            .checked_sub(1)
            .expect("the slot was occupied so the count must be non-zero");
    }

    /// Whether the handle refers to a slot that is occupied by the record it was issued for.
    #[must_use]
    pub fn is_occupied(&self, handle: Handle) -> bool {
        self.free_map.is_occupied(handle.index())
            && self
                .slots
                .get(handle.index())
                .is_some_and(|slot| slot.generation == handle.generation())
    }

    /// The referee recorded when the slot was acquired, if any.
    #[must_use]
    pub fn referee_of(&self, handle: Handle) -> Option<&'static str> {
        if self.is_occupied(handle) {
            self.tracker.referee(handle.index())
        } else {
            None
        }
    }

    /// # Panics
    ///
    /// Panics if the handle does not refer to an occupied slot.
    #[must_use]
    pub fn get(&self, handle: Handle) -> &T {
        self.try_get(handle).unwrap_or_else(|| {
            panic!(
                "get({handle}) handle does not refer to an occupied slot in pool of {}",
                type_name::<T>()
            )
        })
    }

    /// # Panics
    ///
    /// Panics if the handle does not refer to an occupied slot.
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.try_get_mut(handle).unwrap_or_else(|| {
            panic!(
                "get_mut({handle}) handle does not refer to an occupied slot in pool of {}",
                type_name::<T>()
            )
        })
    }

    /// Returns the record behind the handle, or `None` if the handle is stale.
    #[must_use]
    pub fn try_get(&self, handle: Handle) -> Option<&T> {
        if !self.is_occupied(handle) {
            return None;
        }

        self.slots.get(handle.index()).map(|slot| &slot.value)
    }

    /// Returns the record behind the handle, or `None` if the handle is stale.
    #[must_use]
    pub fn try_get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !self.is_occupied(handle) {
            return None;
        }

        self.slots.get_mut(handle.index()).map(|slot| &mut slot.value)
    }

    /// Iterates over occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.free_map.occupied().filter_map(|index| {
            self.slots
                .get(index)
                .map(|slot| (Handle::new(index, slot.generation), &slot.value))
        })
    }

    /// Doubles the capacity (or grows to the maximum capacity, if that is less).
    ///
    /// Every fallible allocation happens before any state is changed, so a failure leaves the
    /// pool exactly as it was.
    fn grow(&mut self) -> Result<()> {
        let capacity = self.capacity();
        let doubled = capacity.saturating_mul(2);
        let limit = self.max_capacity.unwrap_or(MAX_SLOTS).min(MAX_SLOTS);
        let requested = doubled.min(limit);

        let exhausted = PoolError::AllocationExhausted {
            capacity,
            requested: doubled,
        };

        let Some(additional) = requested.checked_sub(capacity).filter(|n| *n > 0) else {
            debug!(pool = type_name::<T>(), capacity, limit, "pool is at its maximum capacity");
            return Err(exhausted);
        };

        if self.slots.try_reserve_exact(additional).is_err()
            || self.free_map.try_reserve_for(requested).is_err()
            || self.tracker.try_reserve_for(requested).is_err()
        {
            debug!(pool = type_name::<T>(), capacity, requested, "pool storage allocation failed");
            return Err(exhausted);
        }

        let constructor = &self.constructor;
        self.slots
            .extend((0..additional).map(|_| Slot::new(constructor())));
        self.free_map.grow_to(requested);
        self.tracker.grow_to(requested);

        self.growth_events = self
            .growth_events
            .checked_add(1)
            .expect("capacity doubles on every growth so this cannot overflow");

        #[cfg(debug_assertions)]
        self.tracker.verify(&self.free_map);

        debug!(
            pool = type_name::<T>(),
            from = capacity,
            to = requested,
            tracked = self.tracker.live_count(),
            "pool grew"
        );

        Ok(())
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let observed = self.free_map.count_occupied();

        assert!(
            self.used_count == observed,
            "used count {} does not match the observed occupied count {observed} in pool of {}",
            self.used_count,
            type_name::<T>()
        );

        assert!(
            self.used_count <= self.capacity(),
            "used count {} exceeds capacity {} in pool of {}",
            self.used_count,
            self.capacity(),
            type_name::<T>()
        );

        self.tracker.verify(&self.free_map);
    }
}

impl<T: Recyclable> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity())
            .field("used_count", &self.used_count)
            .field("growth_events", &self.growth_events)
            .field("max_capacity", &self.max_capacity)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<T: Recyclable> Drop for SlotPool<T> {
    fn drop(&mut self) {
        let was_empty = self.is_empty();

        for slot in &mut self.slots {
            slot.value.release();
        }

        trace!(
            pool = type_name::<T>(),
            slots = self.slots.len(),
            "released every slot at teardown"
        );

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a non-empty pool of {} with a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}
