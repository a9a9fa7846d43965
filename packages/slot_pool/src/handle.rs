use std::fmt;

/// Identifies an occupied slot in a [`SlotPool`][crate::SlotPool].
///
/// A handle is an index plus a generation counter. The index stays valid no matter how many
/// times the pool grows and relocates its storage, so a handle obtained once can be stored for
/// as long as the slot stays occupied and used to reach the same record again.
///
/// The generation is bumped whenever the slot is released. A handle kept past the release of
/// its slot is therefore detected as stale on its next use, even if the slot has since been
/// acquired again for an unrelated record.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    #[must_use]
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self {
            index: u32::try_from(index)
                .expect("pool capacity is limited to u32::MAX slots so every index fits"),
            generation,
        }
    }

    /// The index of the slot within the pool.
    ///
    /// Indexes are assigned lowest-first, so after the pool has been emptied the next acquired
    /// handle has index 0.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// The generation of the slot at the time the handle was issued.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

/// Number of low bits of a [`BlockHandle`] that carry the slot index within a block.
const SLOT_BITS: u32 = 16;

const SLOT_MASK: u32 = (1 << SLOT_BITS) - 1;

/// Largest number of slots a single block of a [`ChainedPool`][crate::ChainedPool] may hold.
pub const MAX_BLOCK_CAPACITY: usize = 1 << SLOT_BITS;

/// Largest number of blocks a [`ChainedPool`][crate::ChainedPool] may chain together.
pub const MAX_BLOCKS: usize = 1 << (u32::BITS - SLOT_BITS);

/// Identifies an occupied slot in a [`ChainedPool`][crate::ChainedPool].
///
/// The handle is a single integer: the high 16 bits hold the block index and the low 16 bits
/// hold the slot index within that block.
///
/// # Handle reuse
///
/// Chained handles carry no generation. Using a handle after its slot has been released may
/// reach a different record or panic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BlockHandle(u32);

impl BlockHandle {
    #[must_use]
    pub(crate) fn from_parts(block_index: usize, slot_index: usize) -> Self {
        assert!(
            block_index < MAX_BLOCKS,
            "block index {block_index} does not fit in a chained handle"
        );
        assert!(
            slot_index < MAX_BLOCK_CAPACITY,
            "slot index {slot_index} does not fit in a chained handle"
        );

        let block_bits = u32::try_from(block_index).expect("range-checked against MAX_BLOCKS");
        let slot_bits =
            u32::try_from(slot_index).expect("range-checked against MAX_BLOCK_CAPACITY");

        Self((block_bits << SLOT_BITS) | slot_bits)
    }

    /// The index of the block that holds the slot.
    #[must_use]
    pub fn block_index(&self) -> usize {
        (self.0 >> SLOT_BITS) as usize
    }

    /// The index of the slot within its block.
    #[must_use]
    pub fn slot_index(&self) -> usize {
        (self.0 & SLOT_MASK) as usize
    }

    /// The raw encoded value.
    #[must_use]
    pub fn to_bits(&self) -> u32 {
        self.0
    }
}
