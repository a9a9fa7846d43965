use std::collections::TryReserveError;

/// One bit per slot, `1` meaning occupied.
///
/// Lookups for a vacant slot scan byte-at-a-time, skipping fully occupied bytes, and then
/// bit-at-a-time within the first byte that has room. Bits past `len` in the last byte are
/// never set.
#[derive(Debug, Default)]
pub(crate) struct FreeMap {
    bytes: Vec<u8>,
    len: usize,
}

const FULL_BYTE: u8 = u8::MAX;

impl FreeMap {
    #[must_use]
    pub(crate) fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; bytes_for(len)],
            len,
        }
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns the lowest index whose bit is clear, if any.
    #[must_use]
    pub(crate) fn first_free(&self) -> Option<usize> {
        for (byte_index, byte) in self.bytes.iter().enumerate() {
            if *byte == FULL_BYTE {
                continue;
            }

            let bit = byte.trailing_ones() as usize;
            let index = byte_index.checked_mul(8)?.checked_add(bit)?;

            // The last byte may be partially used; its unused tail reads as vacant.
            return (index < self.len).then_some(index);
        }

        None
    }

    #[must_use]
    pub(crate) fn is_occupied(&self, index: usize) -> bool {
        let (byte_index, mask) = locate(index);

        index < self.len
            && self
                .bytes
                .get(byte_index)
                .is_some_and(|byte| byte & mask != 0)
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub(crate) fn mark_occupied(&mut self, index: usize) {
        *self.byte_mut(index) |= locate(index).1;
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub(crate) fn mark_free(&mut self, index: usize) {
        *self.byte_mut(index) &= !locate(index).1;
    }

    /// The number of set bits.
    #[must_use]
    pub(crate) fn count_occupied(&self) -> usize {
        self.bytes.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    /// Iterates over the indexes of occupied slots in ascending order.
    pub(crate) fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|index| self.is_occupied(*index))
    }

    /// Ensures that a later [`grow_to()`][Self::grow_to] with the same length cannot fail.
    pub(crate) fn try_reserve_for(&mut self, new_len: usize) -> Result<(), TryReserveError> {
        let additional = bytes_for(new_len).saturating_sub(self.bytes.len());
        self.bytes.try_reserve_exact(additional)
    }

    /// Extends the map with vacant slots.
    pub(crate) fn grow_to(&mut self, new_len: usize) {
        assert!(
            new_len >= self.len,
            "free map cannot shrink from {} to {new_len}",
            self.len
        );

        self.bytes.resize(bytes_for(new_len), 0);
        self.len = new_len;
    }

    fn byte_mut(&mut self, index: usize) -> &mut u8 {
        assert!(
            index < self.len,
            "slot {index} out of bounds in free map of {} slots",
            self.len
        );

        self.bytes
            .get_mut(locate(index).0)
            .expect("bytes cover every index below len")
    }
}

#[must_use]
fn bytes_for(len: usize) -> usize {
    len.div_ceil(8)
}

#[must_use]
fn locate(index: usize) -> (usize, u8) {
    (index / 8, 1 << (index % 8))
}
