#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Object pools for fixed-size records that callers hold on to across many further
//! allocations.
//!
//! Both pool types hand out the lowest-indexed vacant slot, reuse slots instead of
//! reconstructing them and offer a single sweep that releases every occupied slot at the end
//! of a processing phase. They differ in how they grow:
//!
//! * [`SlotPool`] doubles one contiguous arena when it is full. The arena may relocate, so
//!   callers hold generation-checked [`Handle`]s, which keep working across growth and are
//!   detected as stale once their slot is released.
//! * [`ChainedPool`] appends a new block of the original capacity when it is full. Blocks
//!   never move, so references into the pool keep their address. Callers hold
//!   [`BlockHandle`]s that pack the block and slot index into one integer.
//!
//! Slot values implement [`Recyclable`], whose hooks the pool invokes when a slot is reused
//! and when the pool is torn down.
//!
//! # Example
//!
//! ```
//! use slot_pool::SlotPool;
//!
//! let mut headers = SlotPool::<String>::new();
//!
//! let content_type = headers.acquire_tracked("content-type").unwrap();
//! headers.get_mut(content_type).push_str("text/html");
//!
//! assert_eq!(headers.referee_of(content_type), Some("content-type"));
//! assert_eq!(headers.used_count(), 1);
//!
//! headers.release_all();
//! assert!(headers.is_empty());
//! ```

mod block;
mod builder;
mod chained_pool;
mod drop_policy;
mod error;
mod free_map;
mod handle;
mod recyclable;
mod slot_pool;
mod tracker;

pub(crate) use block::*;
pub use builder::*;
pub use chained_pool::*;
pub use drop_policy::*;
pub use error::PoolError;
pub(crate) use free_map::*;
pub use handle::*;
pub use recyclable::*;
pub use slot_pool::*;
pub(crate) use tracker::*;
