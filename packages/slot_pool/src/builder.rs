use std::any::type_name;
use std::fmt;

use crate::{ChainedPool, DropPolicy, Recyclable, SlotPool};

/// Default number of bytes of slot storage a new pool starts with.
///
/// The starting capacity of a pool is this many bytes divided by the size of one item, but
/// never less than one slot.
pub const DEFAULT_ARENA_BYTES: usize = 4096;

pub(crate) type Constructor<T> = Box<dyn Fn() -> T + Send>;

/// Builder for creating an instance of [`SlotPool`] or [`ChainedPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`SlotPool::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use slot_pool::{DropPolicy, SlotPool};
///
/// let pool = SlotPool::<u64>::builder()
///     .initial_capacity(4)
///     .max_capacity(64)
///     .drop_policy(DropPolicy::MayDropItems)
///     .build();
///
/// assert_eq!(pool.capacity(), 4);
/// ```
///
/// [1]: SlotPool::new
#[must_use]
pub struct PoolBuilder<T> {
    constructor: Constructor<T>,
    arena_bytes: usize,
    initial_capacity: Option<usize>,
    max_capacity: Option<usize>,
    drop_policy: DropPolicy,
}

impl<T> fmt::Debug for PoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("arena_bytes", &self.arena_bytes)
            .field("initial_capacity", &self.initial_capacity)
            .field("max_capacity", &self.max_capacity)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<T: Recyclable> PoolBuilder<T> {
    pub(crate) fn new<F>(constructor: F) -> Self
    where
        F: Fn() -> T + Send + 'static,
    {
        Self {
            constructor: Box::new(constructor),
            arena_bytes: DEFAULT_ARENA_BYTES,
            initial_capacity: None,
            max_capacity: None,
            drop_policy: DropPolicy::default(),
        }
    }

    /// Sets the function used to construct the value of every new slot.
    ///
    /// The constructor runs once per slot when the slot is created, either at pool creation or
    /// when the pool grows. It does not run again when a slot is reused.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String>::builder()
    ///     .constructor(|| String::with_capacity(256))
    ///     .build();
    ///
    /// let handle = pool.acquire().unwrap();
    /// assert!(pool.get(handle).capacity() >= 256);
    /// # pool.release(handle);
    /// ```
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> T + Send + 'static,
    {
        self.constructor = Box::new(constructor);
        self
    }

    /// Sets the number of bytes of slot storage the pool starts with.
    ///
    /// The starting capacity is this divided by the item size, with a minimum of one slot.
    /// Ignored if [`initial_capacity()`][Self::initial_capacity] is set.
    pub fn arena_bytes(mut self, bytes: usize) -> Self {
        self.arena_bytes = bytes;
        self
    }

    /// Sets the number of slots the pool starts with, overriding
    /// [`arena_bytes()`][Self::arena_bytes].
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "pool initial capacity must be non-zero");
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets the largest number of slots the pool may grow to.
    ///
    /// An acquire that would need to grow beyond this fails with
    /// [`PoolError::AllocationExhausted`][crate::PoolError::AllocationExhausted].
    pub fn max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat remaining occupied slots when the pool is dropped.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds a relocating pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn build(self) -> SlotPool<T> {
        let capacity = self.starting_capacity();

        SlotPool::new_inner(
            self.constructor,
            capacity,
            self.max_capacity,
            self.drop_policy,
        )
    }

    /// Builds a chained-block pool with the specified configuration.
    ///
    /// Every block holds the starting capacity of slots.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or the starting capacity exceeds
    /// [`MAX_BLOCK_CAPACITY`][crate::MAX_BLOCK_CAPACITY].
    #[must_use]
    pub fn build_chained(self) -> ChainedPool<T> {
        let capacity = self.starting_capacity();

        ChainedPool::new_inner(
            self.constructor,
            capacity,
            self.max_capacity,
            self.drop_policy,
        )
    }

    fn starting_capacity(&self) -> usize {
        assert!(
            size_of::<T>() > 0,
            "pool of {} must have non-zero item size",
            type_name::<T>()
        );

        self.initial_capacity.unwrap_or_else(|| {
            self.arena_bytes
                .checked_div(size_of::<T>())
                .unwrap_or_default()
                .max(1)
        })
    }
}
