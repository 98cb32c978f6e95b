use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one open file on a device
///
/// Waiters, pending interrupts and notification subscriptions are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    id: u64,
}

impl Handle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.id)
    }
}

/// Thread-safe handle generator
#[derive(Debug)]
pub struct IdGen {
    next_id: AtomicU64,
}

impl IdGen {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next unique handle
    pub fn next_handle(&self) -> Handle {
        Handle::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique_and_increasing() {
        let idgen = IdGen::new();
        let a = idgen.next_handle();
        let b = idgen.next_handle();
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(a.id(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Handle::new(7).to_string(), "file#7");
    }
}
