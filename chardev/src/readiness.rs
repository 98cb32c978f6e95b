//! Readable/writable state derived from buffer occupancy

use std::fmt;

pub const POLLIN: u32 = 0x0001;
pub const POLLOUT: u32 = 0x0004;
pub const POLLRDNORM: u32 = 0x0040;
pub const POLLWRNORM: u32 = 0x0100;

/// Snapshot returned by a poll, both flags taken under one lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
}

impl Readiness {
    #[must_use]
    pub fn from_occupancy(used_len: usize, capacity: usize) -> Self {
        Self {
            readable: used_len != 0,
            writable: used_len != capacity,
        }
    }

    /// Event mask in the encoding of `poll(2)`
    #[must_use]
    pub fn mask(self) -> u32 {
        let mut mask = 0;
        if self.readable {
            mask |= POLLIN | POLLRDNORM;
        }
        if self.writable {
            mask |= POLLOUT | POLLWRNORM;
        }
        mask
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.readable, self.writable) {
            (true, true) => write!(f, "readable+writable"),
            (true, false) => write!(f, "readable"),
            (false, true) => write!(f, "writable"),
            (false, false) => write!(f, "none"),
        }
    }
}
