/// Determines pool behavior when the pool is dropped.
///
/// Regardless of the policy, every slot (occupied or vacant) has its
/// [`Recyclable::release()`][crate::Recyclable::release] hook invoked when the pool is dropped.
///
/// # Examples
///
/// ```
/// use slot_pool::{DropPolicy, SlotPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = SlotPool::<String>::builder()
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool may be dropped while slots are still occupied. This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if any slot is still occupied when it is dropped.
    ///
    /// Use this when every acquired record is expected to be released (individually or via a
    /// release-all sweep) before teardown, so that a forgotten handle is caught early.
    MustNotDropItems,
}
