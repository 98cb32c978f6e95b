//! Fixed-capacity FIFO byte store
//!
//! Pure state container: no locking, no waiting. The owner serialises access.

use crate::error::DeviceError;

/// Allocate a zeroed byte region, reporting allocation failure instead of aborting
pub(crate) fn alloc_storage(capacity: usize) -> Result<Box<[u8]>, DeviceError> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(capacity)
        .map_err(|_| DeviceError::ResourceExhausted)?;
    storage.resize(capacity, 0);
    Ok(storage.into_boxed_slice())
}

/// Bounded byte buffer with a used-length cursor
///
/// `storage[..used_len]` holds unread data in FIFO order, always starting at
/// offset 0; `storage[used_len..]` is free space.
///
/// # Example
///
/// ```
/// use chardev::io::BufferCore;
///
/// let mut core = BufferCore::with_capacity(4).unwrap();
/// assert_eq!(core.append(b"AB"), 2);
/// assert_eq!(core.append(b"CDE"), 2);
/// assert!(core.is_full());
///
/// let mut out = [0u8; 3];
/// assert_eq!(core.consume(&mut out), 3);
/// assert_eq!(&out, b"ABC");
/// assert_eq!(core.as_slice(), b"D");
/// ```
pub struct BufferCore {
    storage: Box<[u8]>,
    used_len: usize,
}

impl BufferCore {
    /// Create an empty buffer of `capacity` bytes
    ///
    /// # Errors
    /// Returns `ResourceExhausted` if the storage cannot be allocated.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, DeviceError> {
        assert!(capacity > 0, "buffer capacity must be positive");
        Ok(Self {
            storage: alloc_storage(capacity)?,
            used_len: 0,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of unread bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.used_len
    }

    /// Number of bytes that can still be appended
    #[must_use]
    pub fn free(&self) -> usize {
        self.storage.len() - self.used_len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used_len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.used_len == self.storage.len()
    }

    /// Unread data, oldest byte first
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.used_len]
    }

    /// Copy as much of `data` as fits after the unread bytes
    ///
    /// Returns the number of bytes taken; 0 when the buffer is full.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.free());
        let end = self.used_len + count;
        self.storage[self.used_len..end].copy_from_slice(&data[..count]);
        self.used_len = end;
        count
    }

    /// Move up to `out.len()` of the oldest bytes into `out`
    ///
    /// The remaining unread bytes are shifted down to offset 0 so the next
    /// consume continues exactly where this one stopped.
    pub fn consume(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.used_len);
        out[..count].copy_from_slice(&self.storage[..count]);
        self.storage.copy_within(count..self.used_len, 0);
        self.used_len -= count;
        count
    }

    /// Drop all unread data and zero the storage
    pub fn clear(&mut self) {
        self.storage.fill(0);
        self.used_len = 0;
    }
}

impl std::fmt::Debug for BufferCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferCore")
            .field("capacity", &self.capacity())
            .field("used_len", &self.used_len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let core = BufferCore::with_capacity(8).unwrap();
        assert!(core.is_empty());
        assert!(!core.is_full());
        assert_eq!(core.len(), 0);
        assert_eq!(core.free(), 8);
    }

    #[test]
    fn test_append_truncates_at_capacity() {
        let mut core = BufferCore::with_capacity(5).unwrap();
        assert_eq!(core.append(b"hello world"), 5);
        assert!(core.is_full());
        assert_eq!(core.as_slice(), b"hello");
        assert_eq!(core.append(b"!"), 0);
    }

    #[test]
    fn test_consume_shifts_remaining_bytes() {
        let mut core = BufferCore::with_capacity(16).unwrap();
        core.append(b"AB");
        core.append(b"CD");

        let mut out = [0u8; 3];
        assert_eq!(core.consume(&mut out), 3);
        assert_eq!(&out, b"ABC");

        let mut out = [0u8; 1];
        assert_eq!(core.consume(&mut out), 1);
        assert_eq!(&out, b"D");
        assert!(core.is_empty());
    }

    #[test]
    fn test_consume_more_than_available() {
        let mut core = BufferCore::with_capacity(16).unwrap();
        core.append(b"xyz");

        let mut out = [0u8; 10];
        assert_eq!(core.consume(&mut out), 3);
        assert_eq!(&out[..3], b"xyz");
        assert_eq!(core.consume(&mut out), 0);
    }

    #[test]
    fn test_clear_zeroes_storage() {
        let mut core = BufferCore::with_capacity(4).unwrap();
        core.append(b"abcd");
        core.clear();
        assert!(core.is_empty());
        assert!(core.storage.iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_panics() {
        let _ = BufferCore::with_capacity(0);
    }
}
