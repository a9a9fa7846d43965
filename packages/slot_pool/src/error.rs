use thiserror::Error;

/// Errors that can occur when acquiring slots from a pool.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool had no vacant slot and could not grow its storage.
    ///
    /// The pool is left exactly as it was before the failed acquire; no partial growth is
    /// visible. Callers should treat this as fatal for whatever operation needed the slot.
    #[error("pool of {capacity} slots cannot grow to {requested} slots")]
    AllocationExhausted {
        /// Number of slots the pool had when growth was attempted.
        capacity: usize,

        /// Number of slots the pool attempted to grow to.
        requested: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`PoolError`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(PoolError: Send, Sync, Debug);

    #[test]
    fn exhausted_message_names_sizes() {
        let error = PoolError::AllocationExhausted {
            capacity: 8,
            requested: 16,
        };

        assert_eq!(error.to_string(), "pool of 8 slots cannot grow to 16 slots");
    }
}
