//! Offset-addressed byte store for the plain memory window

use super::buffer::alloc_storage;
use crate::error::DeviceError;

/// Fixed window of bytes with a high-water mark
///
/// Unlike [`super::BufferCore`], reads do not consume anything: every access
/// names its own offset. `used_len` records the furthest byte ever written
/// since the last clear.
pub struct WindowCore {
    storage: Box<[u8]>,
    used_len: usize,
}

impl WindowCore {
    /// # Errors
    /// Returns `ResourceExhausted` if the storage cannot be allocated.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, DeviceError> {
        assert!(capacity > 0, "window capacity must be positive");
        Ok(Self {
            storage: alloc_storage(capacity)?,
            used_len: 0,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn used_len(&self) -> usize {
        self.used_len
    }

    /// Copy bytes starting at `pos` into `out`
    ///
    /// # Errors
    /// `EndOfDevice` if `pos` is at or past the end and `out` is non-empty.
    pub fn read_at(&self, pos: usize, out: &mut [u8]) -> Result<usize, DeviceError> {
        let count = self.clamp(pos, out.len())?;
        out[..count].copy_from_slice(&self.storage[pos..pos + count]);
        Ok(count)
    }

    /// Copy `data` into the window starting at `pos`
    ///
    /// # Errors
    /// `EndOfDevice` if `pos` is at or past the end and `data` is non-empty.
    pub fn write_at(&mut self, pos: usize, data: &[u8]) -> Result<usize, DeviceError> {
        let count = self.clamp(pos, data.len())?;
        let end = pos + count;
        self.storage[pos..end].copy_from_slice(&data[..count]);
        self.used_len = self.used_len.max(end);
        Ok(count)
    }

    pub fn clear(&mut self) {
        self.storage.fill(0);
        self.used_len = 0;
    }

    fn clamp(&self, pos: usize, requested: usize) -> Result<usize, DeviceError> {
        if pos >= self.storage.len() {
            return if requested == 0 {
                Ok(0)
            } else {
                Err(DeviceError::EndOfDevice)
            };
        }
        Ok(requested.min(self.storage.len() - pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_at_offset() {
        let mut core = WindowCore::with_capacity(16).unwrap();
        assert_eq!(core.write_at(4, b"data"), Ok(4));
        assert_eq!(core.used_len(), 8);

        let mut out = [0u8; 4];
        assert_eq!(core.read_at(4, &mut out), Ok(4));
        assert_eq!(&out, b"data");
    }

    #[test]
    fn test_reads_do_not_consume() {
        let mut core = WindowCore::with_capacity(8).unwrap();
        core.write_at(0, b"ab").unwrap();

        let mut out = [0u8; 2];
        core.read_at(0, &mut out).unwrap();
        core.read_at(0, &mut out).unwrap();
        assert_eq!(&out, b"ab");
    }

    #[test]
    fn test_access_clamped_to_window() {
        let mut core = WindowCore::with_capacity(8).unwrap();
        assert_eq!(core.write_at(6, b"wxyz"), Ok(2));
        assert_eq!(core.used_len(), 8);

        let mut out = [0u8; 10];
        assert_eq!(core.read_at(6, &mut out), Ok(2));
        assert_eq!(&out[..2], b"wx");
    }

    #[test]
    fn test_access_past_end() {
        let mut core = WindowCore::with_capacity(8).unwrap();
        let mut out = [0u8; 1];
        assert_eq!(core.read_at(8, &mut out), Err(DeviceError::EndOfDevice));
        assert_eq!(core.write_at(9, b"x"), Err(DeviceError::EndOfDevice));
        assert_eq!(core.read_at(8, &mut []), Ok(0));
        assert_eq!(core.write_at(8, b""), Ok(0));
    }

    #[test]
    fn test_write_does_not_lower_high_water_mark() {
        let mut core = WindowCore::with_capacity(8).unwrap();
        core.write_at(0, b"abcdef").unwrap();
        core.write_at(0, b"z").unwrap();
        assert_eq!(core.used_len(), 6);
        core.clear();
        assert_eq!(core.used_len(), 0);
    }
}
