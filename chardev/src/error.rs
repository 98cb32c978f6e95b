//! Error taxonomy shared by every device variant
//!
//! Each variant corresponds to the errno the kernel drivers hand back to
//! userspace; see [`DeviceError::errno`].

pub const EINTR: i32 = 4;
pub const ENXIO: i32 = 6;
pub const EAGAIN: i32 = 11;
pub const ENOMEM: i32 = 12;
pub const ENODEV: i32 = 19;
pub const EINVAL: i32 = 22;

/// Error type for device operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// Non-blocking call on an empty (read) or full (write) buffer
    #[error("operation would block")]
    WouldBlock,

    /// Blocking call cancelled by an external interrupt
    #[error("interrupted while waiting")]
    Interrupted,

    /// Seek candidate outside `[0, capacity]`
    #[error("seek offset out of range")]
    OutOfRange,

    /// Unknown control code or seek origin
    #[error("invalid operation")]
    InvalidOperation,

    /// Instance construction failed
    #[error("resource exhausted")]
    ResourceExhausted,

    /// The instance was torn down
    #[error("no such device")]
    NoDevice,

    /// Window access at or past the end of the window
    #[error("access past the end of the device")]
    EndOfDevice,
}

impl DeviceError {
    /// POSIX errno the kernel drivers report for this condition
    #[must_use]
    pub fn errno(self) -> i32 {
        match self {
            Self::WouldBlock => EAGAIN,
            Self::Interrupted => EINTR,
            Self::OutOfRange | Self::InvalidOperation => EINVAL,
            Self::ResourceExhausted => ENOMEM,
            Self::NoDevice => ENODEV,
            Self::EndOfDevice => ENXIO,
        }
    }
}

impl embedded_io::Error for DeviceError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            DeviceError::Interrupted => embedded_io::ErrorKind::Interrupted,
            DeviceError::OutOfRange | DeviceError::InvalidOperation => {
                embedded_io::ErrorKind::InvalidInput
            }
            DeviceError::ResourceExhausted => embedded_io::ErrorKind::OutOfMemory,
            DeviceError::NoDevice => embedded_io::ErrorKind::NotConnected,
            DeviceError::WouldBlock | DeviceError::EndOfDevice => embedded_io::ErrorKind::Other,
        }
    }
}

/// Failure reported by a [`crate::nodes::DeviceNodes`] implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("device region '{name}' is busy (major {major})")]
    RegionBusy { name: String, major: u32 },

    #[error("failed to create node {index} of '{name}'")]
    CreateFailed { name: String, index: usize },
}
