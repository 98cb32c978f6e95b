//! Control-plane command codes
//!
//! Exactly one command exists: clear the buffer and reset occupancy to 0.

use crate::error::DeviceError;

pub const MEM_CLEAR: u32 = 0x1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Clear,
}

impl Control {
    /// # Errors
    /// `InvalidOperation` for any code other than [`MEM_CLEAR`].
    pub fn from_raw(cmd: u32) -> Result<Self, DeviceError> {
        match cmd {
            MEM_CLEAR => Ok(Self::Clear),
            _ => Err(DeviceError::InvalidOperation),
        }
    }
}
