//! File-position validation shared by the window and the FIFO
//!
//! A candidate position outside `[0, capacity]` is rejected and the caller
//! keeps its old position. Nothing is ever clamped.

use crate::error::DeviceError;

/// Origin of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// `SEEK_SET`
    Absolute,
    /// `SEEK_CUR`
    RelativeToCurrent,
    /// `SEEK_END`, where the end is the device's `used_len`
    RelativeToEnd,
}

impl SeekMode {
    /// Decode a `whence` argument
    ///
    /// # Errors
    /// `InvalidOperation` for anything but 0, 1 or 2.
    pub fn from_raw(whence: i32) -> Result<Self, DeviceError> {
        match whence {
            0 => Ok(Self::Absolute),
            1 => Ok(Self::RelativeToCurrent),
            2 => Ok(Self::RelativeToEnd),
            _ => Err(DeviceError::InvalidOperation),
        }
    }
}

/// Compute the position a seek would move to
///
/// For `RelativeToEnd` both `current + delta` and `used_len + delta` must be
/// inside the device.
///
/// # Errors
/// `OutOfRange` if the candidate is negative or past `capacity`.
pub fn seek(
    current: u64,
    delta: i64,
    mode: SeekMode,
    used_len: usize,
    capacity: usize,
) -> Result<u64, DeviceError> {
    let capacity = capacity as i128;
    let in_range = |pos: i128| (0..=capacity).contains(&pos);
    let from_current = i128::from(current) + i128::from(delta);

    let candidate = match mode {
        SeekMode::Absolute => i128::from(delta),
        SeekMode::RelativeToCurrent => from_current,
        SeekMode::RelativeToEnd => {
            if !in_range(from_current) {
                return Err(DeviceError::OutOfRange);
            }
            used_len as i128 + i128::from(delta)
        }
    };

    if !in_range(candidate) {
        return Err(DeviceError::OutOfRange);
    }
    u64::try_from(candidate).map_err(|_| DeviceError::OutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: usize = 4096;

    #[test]
    fn test_absolute() {
        assert_eq!(seek(10, 0, SeekMode::Absolute, 0, CAP), Ok(0));
        assert_eq!(seek(10, 4096, SeekMode::Absolute, 0, CAP), Ok(4096));
        assert_eq!(
            seek(10, 4097, SeekMode::Absolute, 0, CAP),
            Err(DeviceError::OutOfRange)
        );
        assert_eq!(
            seek(10, -1, SeekMode::Absolute, 0, CAP),
            Err(DeviceError::OutOfRange)
        );
    }

    #[test]
    fn test_relative_to_current() {
        assert_eq!(seek(100, -40, SeekMode::RelativeToCurrent, 0, CAP), Ok(60));
        assert_eq!(
            seek(100, -101, SeekMode::RelativeToCurrent, 0, CAP),
            Err(DeviceError::OutOfRange)
        );
        assert_eq!(
            seek(4000, 97, SeekMode::RelativeToCurrent, 0, CAP),
            Err(DeviceError::OutOfRange)
        );
    }

    #[test]
    fn test_relative_to_end() {
        assert_eq!(seek(0, 0, SeekMode::RelativeToEnd, 11, CAP), Ok(11));
        assert_eq!(seek(0, 5, SeekMode::RelativeToEnd, 11, CAP), Ok(16));
        assert_eq!(
            seek(0, -12, SeekMode::RelativeToEnd, 11, CAP),
            Err(DeviceError::OutOfRange)
        );
        assert_eq!(
            seek(0, 4090, SeekMode::RelativeToEnd, 11, CAP),
            Err(DeviceError::OutOfRange)
        );
    }

    #[test]
    fn test_relative_to_end_checks_current_position_too() {
        // used_len + delta is fine, but current + delta is not
        assert_eq!(
            seek(4000, 100, SeekMode::RelativeToEnd, 0, CAP),
            Err(DeviceError::OutOfRange)
        );
    }

    #[test]
    fn test_extreme_deltas_do_not_overflow() {
        assert_eq!(
            seek(u64::MAX, i64::MAX, SeekMode::RelativeToCurrent, 0, CAP),
            Err(DeviceError::OutOfRange)
        );
        assert_eq!(
            seek(0, i64::MIN, SeekMode::RelativeToEnd, CAP, CAP),
            Err(DeviceError::OutOfRange)
        );
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(SeekMode::from_raw(0), Ok(SeekMode::Absolute));
        assert_eq!(SeekMode::from_raw(2), Ok(SeekMode::RelativeToEnd));
        assert_eq!(SeekMode::from_raw(3), Err(DeviceError::InvalidOperation));
    }
}
