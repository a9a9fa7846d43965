use std::{fmt, iter, mem};

/// A growable byte buffer that supports splicing bytes in and out of the middle.
///
/// Raw socket data is appended to the tail while the response streams in, and the text cleanup
/// passes open and close gaps in place, as do formula rendering and line justification. Positions into the buffer are plain byte offsets, so
/// they stay meaningful across any reallocation that growth causes.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer that can hold `capacity` bytes without reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Appends `bytes` to the end of the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Opens a gap of `length` zero bytes at `offset`, shifting the tail towards the end.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is past the end of the buffer.
    pub fn insert_shift(&mut self, offset: usize, length: usize) {
        assert!(
            offset <= self.data.len(),
            "insert offset {offset} is past the end of a {} byte buffer",
            self.data.len()
        );

        self.data.splice(offset..offset, iter::repeat_n(0, length));
    }

    /// Replaces `length` bytes at `offset` with `replacement`, closing or opening the gap as
    /// needed.
    ///
    /// # Panics
    ///
    /// Panics if the replaced range extends past the end of the buffer.
    pub fn splice(&mut self, offset: usize, length: usize, replacement: &[u8]) {
        let end = offset
            .checked_add(length)
            .expect("a range inside a buffer cannot overflow usize");

        self.data.splice(offset..end, replacement.iter().copied());
    }

    /// Removes `length` bytes starting at `offset`, shifting the tail to close the gap.
    ///
    /// # Panics
    ///
    /// Panics if the removed range extends past the end of the buffer.
    pub fn delete_collapse(&mut self, offset: usize, length: usize) {
        let end = offset
            .checked_add(length)
            .expect("a range inside a buffer cannot overflow usize");

        self.data.drain(offset..end);
    }

    /// Removes every byte, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// The number of bytes in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The buffered bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The buffered bytes, mutable in place.
    #[must_use]
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Finds the first occurrence of `pattern` at or after `from`.
    #[must_use]
    pub fn find(&self, pattern: &[u8], from: usize) -> Option<usize> {
        find_bytes(self.data.get(from..)?, pattern).map(|position| {
            position
                .checked_add(from)
                .expect("a match lies within the buffer so its offset fits in usize")
        })
    }

    /// Finds the first occurrence of `byte` at or after `from`.
    #[must_use]
    pub fn find_byte(&self, byte: u8, from: usize) -> Option<usize> {
        self.data
            .get(from..)?
            .iter()
            .position(|candidate| *candidate == byte)
            .map(|position| {
                position
                    .checked_add(from)
                    .expect("a match lies within the buffer so its offset fits in usize")
            })
    }

    /// Takes the buffered bytes out, leaving the buffer empty.
    #[must_use]
    pub fn take(&mut self) -> Vec<u8> {
        mem::take(&mut self.data)
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}

impl fmt::Debug for ByteBuffer {
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    #[cfg_attr(coverage_nightly, coverage(off))] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.data.len())
            .field("text", &String::from_utf8_lossy(&self.data))
            .finish()
    }
}

/// Finds the first occurrence of `pattern` in `haystack`.
///
/// An empty pattern matches at offset zero.
#[must_use]
pub(crate) fn find_bytes(haystack: &[u8], pattern: &[u8]) -> Option<usize> {
    if pattern.is_empty() {
        return Some(0);
    }

    haystack
        .windows(pattern.len())
        .position(|window| window == pattern)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn append_and_find() {
        let mut buffer = ByteBuffer::with_capacity(4);
        buffer.append(b"HTTP/1.1 200 OK\r\n");
        buffer.append(b"Host: x\r\n\r\nbody");

        assert_eq!(buffer.find(b"\r\n\r\n", 0), Some(24));
        assert_eq!(buffer.find(b"\r\n", 17), Some(24));
        assert_eq!(buffer.find(b"missing", 0), None);
        assert_eq!(buffer.find(b"x", 1000), None);
        assert_eq!(buffer.find_byte(b':', 0), Some(21));
    }

    #[test]
    fn insert_shift_opens_zeroed_gap() {
        let mut buffer = ByteBuffer::from(&b"abcd"[..]);
        buffer.insert_shift(2, 3);

        assert_eq!(buffer.as_bytes(), b"ab\0\0\0cd");

        buffer.as_mut_bytes()[2..5].copy_from_slice(b"XYZ");
        assert_eq!(buffer.as_bytes(), b"abXYZcd");
    }

    #[test]
    fn delete_collapse_closes_gap() {
        let mut buffer = ByteBuffer::from(&b"a<b>c"[..]);
        buffer.delete_collapse(1, 3);

        assert_eq!(buffer.as_bytes(), b"ac");
    }

    #[test]
    fn splice_replaces_range() {
        let mut buffer = ByteBuffer::from(&b"1 &amp; 2"[..]);
        buffer.splice(2, 5, b"&");

        assert_eq!(buffer.as_bytes(), b"1 & 2");
    }

    #[test]
    #[should_panic]
    fn insert_past_end_panics() {
        let mut buffer = ByteBuffer::new();
        buffer.insert_shift(1, 1);
    }

    #[test]
    fn clear_and_take() {
        let mut buffer = ByteBuffer::from(vec![1, 2, 3]);
        assert_eq!(buffer.take(), vec![1, 2, 3]);
        assert!(buffer.is_empty());

        buffer.append(b"x");
        buffer.clear();
        assert_eq!(buffer.len(), 0);
    }
}
