/// Lifecycle hooks for values that live in a pool slot.
///
/// Pool slots are constructed once and then reused as many different logical records over the
/// lifetime of the pool. The pool never drops or reconstructs a slot's value between uses, so
/// any state left behind by the previous record remains in place until one of these hooks
/// clears it:
///
/// * [`reset()`][Self::reset] is invoked when a slot that held a previous record is handed out
///   again. It is not invoked for the very first acquire of a freshly constructed slot.
/// * [`release()`][Self::release] is invoked exactly once per slot when the pool is torn down,
///   whether or not the slot is occupied at that time.
///
/// Releasing a single slot back to the pool invokes neither hook.
///
/// # Examples
///
/// ```
/// use slot_pool::{Recyclable, SlotPool};
///
/// #[derive(Default)]
/// struct Line {
///     text: String,
///     number: usize,
/// }
///
/// impl Recyclable for Line {
///     fn reset(&mut self) {
///         // Keep the allocation, forget the content.
///         self.text.clear();
///         self.number = 0;
///     }
/// }
///
/// let mut pool = SlotPool::<Line>::new();
///
/// let first = pool.acquire().unwrap();
/// pool.get_mut(first).text.push_str("hello");
/// pool.release(first);
///
/// let second = pool.acquire().unwrap();
/// assert!(pool.get(second).text.is_empty());
/// # pool.release(second);
/// ```
pub trait Recyclable {
    /// Clears the value so the slot can hold a new logical record.
    fn reset(&mut self);

    /// Releases any nested resources at pool teardown.
    ///
    /// The default implementation does nothing and leaves resource cleanup to `Drop`.
    fn release(&mut self) {}
}

macro_rules! recyclable_by_default {
    ($($t:ty),*) => {
        $(
            impl Recyclable for $t {
                fn reset(&mut self) {
                    *self = <$t>::default();
                }
            }
        )*
    };
}

recyclable_by_default!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char
);

impl Recyclable for String {
    fn reset(&mut self) {
        self.clear();
    }

    fn release(&mut self) {
        *self = Self::new();
    }
}

impl<T> Recyclable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }

    fn release(&mut self) {
        *self = Self::new();
    }
}

impl<T> Recyclable for Option<T> {
    fn reset(&mut self) {
        *self = None;
    }
}
