//! Blocking/non-blocking access to one bounded buffer
//!
//! [`SyncGate`] is the only code that mutates a [`BufferCore`]. It pairs the
//! buffer lock with a [`WaitQueueArc`] holding two conditions and a
//! [`Notifier`] for async events:
//!
//! - a read on an empty buffer waits for `DataAvailable`;
//! - a write on a full buffer waits for `SpaceAvailable`;
//! - an empty→non-empty transition wakes readers and notifies `Readable`;
//! - a full→non-full transition (or a clear) wakes writers and notifies
//!   `Writable`.
//!
//! # Thread Safety
//!
//! All methods take `&self`; share the gate through an `Arc`.
//! - The buffer lock is never held across an `.await`.
//! - Wake-ups and notifications are sent after the buffer lock is released.
//! - A blocked caller re-checks the buffer under the queue lock before it
//!   registers, so a transition cannot slip between check and sleep.
//! - Partial transfers are normal: a read returns what is there, a write
//!   takes what fits.

use parking_lot::Mutex;
use std::fmt;

use crate::error::DeviceError;
use crate::idgen::Handle;
use crate::io::BufferCore;
use crate::notifier::{Notifier, PollEvent};
use crate::readiness::Readiness;
use crate::wait_queue::{Condition, WaitQueueArc, WakeReason};

/// Lock, two wait conditions and subscriber set around one buffer
pub struct SyncGate {
    core: Mutex<BufferCore>,
    capacity: usize,
    waits: WaitQueueArc,
    notifier: Notifier,
    debug_hint: String,
}

impl SyncGate {
    /// Create a gate around a fresh buffer of `capacity` bytes
    ///
    /// # Errors
    /// Returns `ResourceExhausted` if the buffer cannot be allocated.
    pub fn new(capacity: usize, debug_hint: &str) -> Result<Self, DeviceError> {
        let core = BufferCore::with_capacity(capacity)?;
        Ok(Self {
            core: Mutex::new(core),
            capacity,
            waits: WaitQueueArc::new(),
            notifier: Notifier::new(debug_hint),
            debug_hint: debug_hint.to_string(),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of unread bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.lock().is_empty()
    }

    #[must_use]
    pub fn wait_queue(&self) -> &WaitQueueArc {
        &self.waits
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Read up to `out.len()` bytes
    ///
    /// On an empty buffer a non-blocking call fails with `WouldBlock`; a
    /// blocking call suspends until a writer supplies data.
    ///
    /// # Errors
    /// - `WouldBlock`: `nonblocking` and the buffer is empty
    /// - `Interrupted`: an interrupt reached `owner` while it waited; nothing
    ///   was consumed
    /// - `NoDevice`: the gate was shut down
    pub async fn read(
        &self,
        owner: Handle,
        out: &mut [u8],
        nonblocking: bool,
    ) -> Result<usize, DeviceError> {
        loop {
            if let Some(count) = self.try_consume(out) {
                return Ok(count);
            }
            if nonblocking {
                return Err(DeviceError::WouldBlock);
            }
            self.wait_for(owner, Condition::DataAvailable).await?;
        }
    }

    /// Write as much of `data` as fits
    ///
    /// On a full buffer a non-blocking call fails with `WouldBlock`; a
    /// blocking call suspends until a reader frees space.
    ///
    /// # Errors
    /// - `WouldBlock`: `nonblocking` and the buffer is full
    /// - `Interrupted`: an interrupt reached `owner` while it waited; nothing
    ///   was appended
    /// - `NoDevice`: the gate was shut down
    pub async fn write(
        &self,
        owner: Handle,
        data: &[u8],
        nonblocking: bool,
    ) -> Result<usize, DeviceError> {
        loop {
            if let Some(count) = self.try_append(data) {
                return Ok(count);
            }
            if nonblocking {
                return Err(DeviceError::WouldBlock);
            }
            self.wait_for(owner, Condition::SpaceAvailable).await?;
        }
    }

    /// Drop all unread data
    ///
    /// Always waits for the buffer lock. A cleared buffer is writable, so
    /// blocked writers are woken and subscribers get `Writable`.
    pub fn clear(&self) {
        self.core.lock().clear();
        log::info!("{}: buffer cleared", self.debug_hint);

        self.waits.wake(Condition::SpaceAvailable);
        self.notifier.notify(PollEvent::Writable);
    }

    /// Consistent readable/writable snapshot
    #[must_use]
    pub fn poll(&self) -> Readiness {
        let used_len = self.core.lock().len();
        Readiness::from_occupancy(used_len, self.capacity)
    }

    /// Wake every blocked caller with `NoDevice` and end all event streams
    pub fn shutdown(&self) {
        self.waits.shutdown();
        self.notifier.close();
    }

    /// `None` if the buffer is empty
    fn try_consume(&self, out: &mut [u8]) -> Option<usize> {
        let mut core = self.core.lock();
        if core.is_empty() {
            return None;
        }
        let was_full = core.is_full();
        let count = core.consume(out);
        let left = core.len();
        drop(core);

        log::info!("{}: read {count} bytes, {left} left", self.debug_hint);

        // Notify outside lock
        if was_full && count > 0 {
            self.waits.wake(Condition::SpaceAvailable);
            self.notifier.notify(PollEvent::Writable);
        }
        Some(count)
    }

    /// `None` if the buffer is full
    fn try_append(&self, data: &[u8]) -> Option<usize> {
        let mut core = self.core.lock();
        if core.is_full() {
            return None;
        }
        let was_empty = core.is_empty();
        let count = core.append(data);
        let used = core.len();
        drop(core);

        log::info!(
            "{}: wrote {count} of {} bytes, {used} used",
            self.debug_hint,
            data.len()
        );

        // Notify outside lock
        if was_empty && count > 0 {
            self.waits.wake(Condition::DataAvailable);
            self.notifier.notify(PollEvent::Readable);
        }
        Some(count)
    }

    fn must_wait(&self, condition: Condition) -> bool {
        let core = self.core.lock();
        match condition {
            Condition::DataAvailable => core.is_empty(),
            Condition::SpaceAvailable => core.is_full(),
        }
    }

    /// Suspend `owner` until `condition` is signalled
    ///
    /// See the `crate::wait_queue` documentation for the workflow explanation
    /// (check (in the caller) - lock (here) - check again (here))
    async fn wait_for(&self, owner: Handle, condition: Condition) -> Result<(), DeviceError> {
        let wait = {
            let queue_lock = self.waits.get_lock();
            if !self.must_wait(condition) {
                drop(queue_lock);
                return Ok(());
            }
            self.waits
                .wait_async(condition, owner, &self.debug_hint, queue_lock)
        };

        match wait.await {
            WakeReason::Ready => Ok(()),
            WakeReason::Interrupted => {
                log::debug!("{}: {owner} interrupted waiting for {condition:?}", self.debug_hint);
                Err(DeviceError::Interrupted)
            }
            WakeReason::Gone => Err(DeviceError::NoDevice),
        }
    }
}

impl fmt::Debug for SyncGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyncGate(hint={}, used={}, capacity={}, subscribers={})",
            self.debug_hint,
            self.len(),
            self.capacity,
            self.notifier.subscriber_count()
        )
    }
}
