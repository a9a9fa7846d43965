use std::any::type_name;
use std::fmt;
use std::thread;

use tracing::debug;

use crate::builder::Constructor;
use crate::error::Result;
use crate::{
    Block, BlockHandle, DropPolicy, MAX_BLOCK_CAPACITY, MAX_BLOCKS, PoolBuilder, PoolError,
    Recyclable,
};

/// A pool of fixed-size records that never relocates, addressed by [`BlockHandle`].
///
/// The pool is a chain of blocks, each holding the pool's starting capacity of slots. When
/// every slot of every block is occupied, the next acquire appends a new block and hands out
/// its first slot. Existing blocks never move, so a reference to a record obtained through
/// [`get()`][1] points at the same address for as long as the pool exists.
///
/// Slots are filled from the lowest block with a vacant slot, and within a block from the
/// lowest vacant index.
///
/// # Examples
///
/// ```
/// use slot_pool::ChainedPool;
///
/// let mut pool = ChainedPool::<u32>::builder().initial_capacity(2).build_chained();
///
/// let a = pool.acquire().unwrap();
/// let b = pool.acquire().unwrap();
/// let c = pool.acquire().unwrap();
///
/// assert_eq!((a.block_index(), a.slot_index()), (0, 0));
/// assert_eq!((b.block_index(), b.slot_index()), (0, 1));
/// assert_eq!((c.block_index(), c.slot_index()), (1, 0));
/// assert_eq!(pool.capacity(), 4);
/// # pool.release_all();
/// ```
///
/// [1]: Self::get
pub struct ChainedPool<T: Recyclable> {
    /// Once appended, a block is never removed or moved.
    blocks: Vec<Block<T>>,

    block_capacity: usize,

    used_count: usize,

    /// Lowest index of any block that has a vacant slot, if known. This is a cache, not the
    /// ground truth: `None` does not imply that every block is full.
    block_with_vacant_slot_index: Option<usize>,

    constructor: Constructor<T>,

    max_capacity: Option<usize>,

    drop_policy: DropPolicy,
}

impl<T: Recyclable + Default + 'static> ChainedPool<T> {
    /// Creates a new pool with the default configuration, constructing slots via `T::default()`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build_chained()
    }

    /// Starts building a new pool that constructs slots via `T::default()`.
    ///
    /// Finish with [`PoolBuilder::build_chained()`].
    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new(T::default)
    }
}

impl<T: Recyclable + Default + 'static> Default for ChainedPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Recyclable> ChainedPool<T> {
    #[must_use]
    pub(crate) fn new_inner(
        constructor: Constructor<T>,
        block_capacity: usize,
        max_capacity: Option<usize>,
        drop_policy: DropPolicy,
    ) -> Self {
        assert!(
            block_capacity <= MAX_BLOCK_CAPACITY,
            "chained pool of {} cannot have blocks of {block_capacity} slots",
            type_name::<T>()
        );

        let first = Block::try_new(block_capacity, &constructor).expect(
            "we do not intend to handle allocation failure as a real possibility - OOM is panic",
        );

        Self {
            blocks: vec![first],
            block_capacity,
            used_count: 0,
            block_with_vacant_slot_index: Some(0),
            constructor,
            max_capacity,
            drop_policy,
        }
    }

    /// The total number of slots across all blocks.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks
            .len()
            .checked_mul(self.block_capacity)
            .expect("guarded by MAX_BLOCKS and MAX_BLOCK_CAPACITY")
    }

    /// The number of slots in every block.
    #[must_use]
    pub fn block_capacity(&self) -> usize {
        self.block_capacity
    }

    /// The number of blocks in the chain.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The number of occupied slots.
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.used_count
    }

    /// Whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used_count == 0
    }

    /// Acquires a vacant slot, appending a new block if every existing block is full.
    ///
    /// If the slot held a previous record, its value is [reset][Recyclable::reset] first.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AllocationExhausted`] if a new block is needed but cannot be
    /// appended. The pool is unchanged in that case.
    pub fn acquire(&mut self) -> Result<BlockHandle> {
        #[cfg(debug_assertions)]
        self.integrity_check();

        let block_index = self.index_of_block_with_vacant_slot()?;

        let block = self
            .blocks
            .get_mut(block_index)
            .expect("we just verified that there is a block with a vacant slot at this index");

        let slot_index = block
            .acquire()
            .expect("we just verified that this block has a vacant slot");

        if block.is_full() {
            self.block_with_vacant_slot_index = None;
        }

        self.used_count = self
            .used_count
            .checked_add(1)
            .expect("guarded by MAX_BLOCKS and MAX_BLOCK_CAPACITY");

        Ok(BlockHandle::from_parts(block_index, slot_index))
    }

    /// Releases an occupied slot back to its block.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to an occupied slot.
    pub fn release(&mut self, handle: BlockHandle) {
        let Some(block) = self.blocks.get_mut(handle.block_index()) else {
            panic!(
                "release({}) handle refers to a block that does not exist in pool of {}",
                handle.to_bits(),
                type_name::<T>()
            )
        };

        block.release(handle.slot_index());

        self.used_count = self
            .used_count
            .checked_sub(1)
            .expect("the slot was occupied so the count must be non-zero");

        self.update_vacant_slot_cache(handle.block_index());
    }

    /// Releases every occupied slot in every block. Returns how many were released.
    ///
    /// The next acquire returns slot 0 of block 0.
    pub fn release_all(&mut self) -> usize {
        let released: usize = self.blocks.iter_mut().map(Block::release_all).sum();

        self.used_count = 0;
        self.block_with_vacant_slot_index = Some(0);

        debug!(
            pool = type_name::<T>(),
            released,
            blocks = self.blocks.len(),
            "released all occupied slots"
        );

        released
    }

    /// Whether the handle refers to an occupied slot.
    #[must_use]
    pub fn is_occupied(&self, handle: BlockHandle) -> bool {
        self.blocks
            .get(handle.block_index())
            .is_some_and(|block| block.is_occupied(handle.slot_index()))
    }

    /// # Panics
    ///
    /// Panics if the handle does not refer to an occupied slot.
    #[must_use]
    pub fn get(&self, handle: BlockHandle) -> &T {
        self.blocks
            .get(handle.block_index())
            .map(|block| block.get(handle.slot_index()))
            .expect("handle was not associated with a block in the pool")
    }

    /// # Panics
    ///
    /// Panics if the handle does not refer to an occupied slot.
    #[must_use]
    pub fn get_mut(&mut self, handle: BlockHandle) -> &mut T {
        self.blocks
            .get_mut(handle.block_index())
            .map(|block| block.get_mut(handle.slot_index()))
            .expect("handle was not associated with a block in the pool")
    }

    fn index_of_block_with_vacant_slot(&mut self) -> Result<usize> {
        if let Some(index) = self.block_with_vacant_slot_index {
            return Ok(index);
        }

        // Only the last block can have room once a new block has been appended, unless slots
        // were released since, so we scan from the start to refill holes first.
        let index = if let Some(index) = self.blocks.iter().position(|block| !block.is_full()) {
            index
        } else {
            self.append_block()?
        };

        self.block_with_vacant_slot_index = Some(index);
        Ok(index)
    }

    fn append_block(&mut self) -> Result<usize> {
        let capacity = self.capacity();
        let requested = capacity.saturating_add(self.block_capacity);

        let exhausted = PoolError::AllocationExhausted {
            capacity,
            requested,
        };

        if self.blocks.len() >= MAX_BLOCKS || self.max_capacity.is_some_and(|max| requested > max)
        {
            debug!(pool = type_name::<T>(), capacity, "chained pool is at its maximum capacity");
            return Err(exhausted);
        }

        if self.blocks.try_reserve(1).is_err() {
            return Err(exhausted);
        }

        let block = Block::try_new(self.block_capacity, &self.constructor).ok_or(exhausted)?;
        self.blocks.push(block);

        debug!(
            pool = type_name::<T>(),
            blocks = self.blocks.len(),
            block_capacity = self.block_capacity,
            "chained pool appended a block"
        );

        Ok(self
            .blocks
            .len()
            .checked_sub(1)
            .expect("we just pushed a block, so this cannot overflow because len >= 1"))
    }

    #[cfg_attr(test, mutants::skip)] // Some mutations are untestable - this is just a cache so even if this gets mutated away, we will still operate correctly, just with less performance.
    fn update_vacant_slot_cache(&mut self, block_with_vacant_slot_index: usize) {
        if self
            .block_with_vacant_slot_index
            .is_none_or(|current| current > block_with_vacant_slot_index)
        {
            self.block_with_vacant_slot_index = Some(block_with_vacant_slot_index);
        }
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let mut observed: usize = 0;

        for block in &self.blocks {
            block.integrity_check();
            observed = observed
                .checked_add(block.len())
                .expect("guarded by MAX_BLOCKS and MAX_BLOCK_CAPACITY");
        }

        assert!(
            self.used_count == observed,
            "used count {} does not match the observed occupied count {observed} in pool of {}",
            self.used_count,
            type_name::<T>()
        );
    }
}

impl<T: Recyclable> fmt::Debug for ChainedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("blocks", &self.blocks.len())
            .field("block_capacity", &self.block_capacity)
            .field("used_count", &self.used_count)
            .field("max_capacity", &self.max_capacity)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<T: Recyclable> Drop for ChainedPool<T> {
    fn drop(&mut self) {
        let was_empty = self.is_empty();

        for block in &mut self.blocks {
            block.release_values();
        }

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a non-empty chained pool of {} with a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}
