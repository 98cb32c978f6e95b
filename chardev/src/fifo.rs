//! Blocking FIFO device
//!
//! One [`FifoDevice`] is one instance: a [`SyncGate`] plus the bookkeeping for
//! the files opened on it. Every [`FifoFile`] gets its own handle, blocking
//! flag, file position and async-notification stream.
//!
//! # Thread Safety
//!
//! - `FifoDevice` is shared through `Arc`; any number of files may be open
//!   on it from any number of tasks.
//! - `read`, `write`, `poll`, `clear` and `ioctl` take `&self`, so one file
//!   can be shared too. Operations that change per-file state (`seek`, the
//!   flag setters, event consumption) take `&mut self`.
//! - A blocked call of a file is cancelled through its [`Interrupter`], or
//!   by dropping the future; neither consumes or produces any bytes.

use embedded_io_async::{ErrorType, Read, Write};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

use crate::config::DeviceConfig;
use crate::control::Control;
use crate::error::DeviceError;
use crate::gate::SyncGate;
use crate::idgen::{Handle, IdGen};
use crate::notifier::PollEvent;
use crate::readiness::Readiness;
use crate::registry::CharDevice;
use crate::seek::{seek, SeekMode};
use crate::wait_queue::{Condition, WaitQueueArc};

/// Blocking behaviour of an open file (`O_NONBLOCK`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Blocking,
    NonBlocking,
}

/// One FIFO instance
pub struct FifoDevice {
    index: usize,
    gate: Arc<SyncGate>,
    idgen: IdGen,
}

impl FifoDevice {
    /// # Errors
    /// Returns `ResourceExhausted` if the buffer cannot be allocated.
    pub fn new(index: usize, capacity: usize, debug_hint: &str) -> Result<Self, DeviceError> {
        Ok(Self {
            index,
            gate: Arc::new(SyncGate::new(capacity, debug_hint)?),
            idgen: IdGen::new(),
        })
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.gate.capacity()
    }

    #[must_use]
    pub fn gate(&self) -> &SyncGate {
        &self.gate
    }

    /// Number of calls blocked on `condition`
    #[must_use]
    pub fn waiting(&self, condition: Condition) -> usize {
        self.gate.wait_queue().waiter_count(condition)
    }

    /// Open a new file on this instance
    ///
    /// The file starts at position 0 and is attached to async notifications.
    /// A file that loses the race with a concurrent shutdown gets an already
    /// ended event stream.
    ///
    /// # Errors
    /// `NoDevice` if the instance has been shut down.
    pub fn open(&self, mode: OpenMode) -> Result<FifoFile, DeviceError> {
        let waits = self.gate.wait_queue();
        if waits.is_shut_down() {
            return Err(DeviceError::NoDevice);
        }
        let handle = self.idgen.next_handle();
        waits.whitelist(handle);
        let events = self.gate.notifier().attach(handle);
        log::debug!("fifo{}: opened {handle} ({mode:?})", self.index);

        Ok(FifoFile {
            handle,
            index: self.index,
            gate: Arc::clone(&self.gate),
            nonblocking: mode == OpenMode::NonBlocking,
            pos: 0,
            events: Some(events),
        })
    }
}

impl CharDevice for FifoDevice {
    fn create(index: usize, config: &DeviceConfig) -> Result<Self, DeviceError> {
        Self::new(index, config.capacity, &config.node_name(index))
    }

    fn shutdown(&self) {
        self.gate.shutdown();
    }
}

impl fmt::Debug for FifoDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FifoDevice(index={}, gate={:?})", self.index, self.gate)
    }
}

/// Delivers an external interrupt to one file's blocked call
///
/// Cloneable and usable from any task. See `crate::wait_queue` for the
/// pending-interrupt rules.
#[derive(Clone, Debug)]
pub struct Interrupter {
    handle: Handle,
    waits: WaitQueueArc,
}

impl Interrupter {
    /// Returns `true` if a blocked call was woken, `false` if the interrupt
    /// is left pending for the next blocking wait
    pub fn interrupt(&self) -> bool {
        self.waits.interrupt(self.handle)
    }
}

/// An open file on a [`FifoDevice`]
pub struct FifoFile {
    handle: Handle,
    index: usize,
    gate: Arc<SyncGate>,
    nonblocking: bool,
    pos: u64,
    events: Option<Receiver<PollEvent>>,
}

impl FifoFile {
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    #[must_use]
    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }

    pub fn set_nonblocking(&mut self, nonblocking: bool) {
        self.nonblocking = nonblocking;
    }

    /// Read up to `buf.len()` bytes, following the file's blocking mode
    ///
    /// # Errors
    /// `WouldBlock`, `Interrupted` or `NoDevice`; see [`SyncGate::read`].
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        self.gate.read(self.handle, buf, self.nonblocking).await
    }

    /// Write as much of `data` as fits, following the file's blocking mode
    ///
    /// # Errors
    /// `WouldBlock`, `Interrupted` or `NoDevice`; see [`SyncGate::write`].
    pub async fn write(&self, data: &[u8]) -> Result<usize, DeviceError> {
        self.gate.write(self.handle, data, self.nonblocking).await
    }

    #[must_use]
    pub fn poll(&self) -> Readiness {
        self.gate.poll()
    }

    pub fn clear(&self) {
        self.gate.clear();
    }

    /// Run a control command
    ///
    /// # Errors
    /// `InvalidOperation` for unknown command codes.
    pub fn ioctl(&self, cmd: u32) -> Result<(), DeviceError> {
        match Control::from_raw(cmd) {
            Ok(Control::Clear) => {
                self.gate.clear();
                Ok(())
            }
            Err(e) => {
                log::debug!("fifo{}: {} rejected ioctl {cmd:#x}", self.index, self.handle);
                Err(e)
            }
        }
    }

    /// Move the file position
    ///
    /// The FIFO's reads and writes do not use the position; `RelativeToEnd`
    /// is measured from the current number of unread bytes.
    ///
    /// # Errors
    /// `OutOfRange` if the new position would leave `[0, capacity]`; the
    /// position is unchanged.
    pub fn seek(&mut self, offset: i64, mode: SeekMode) -> Result<u64, DeviceError> {
        let used_len = self.gate.len();
        self.pos = seek(self.pos, offset, mode, used_len, self.gate.capacity())?;
        Ok(self.pos)
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            handle: self.handle,
            waits: self.gate.wait_queue().clone(),
        }
    }

    /// Turn async notifications on or off (`FASYNC`)
    pub fn set_async(&mut self, on: bool) {
        if on {
            if self.events.is_none() {
                self.events = Some(self.gate.notifier().attach(self.handle));
            }
        } else {
            self.gate.notifier().detach(self.handle);
            self.events = None;
        }
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        self.events.is_some()
    }

    /// Wait for the next async notification
    ///
    /// Returns `None` when notifications are off or the instance was torn
    /// down.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    /// Take an already delivered notification, if any
    pub fn try_next_event(&mut self) -> Option<PollEvent> {
        self.events.as_mut().and_then(|events| events.try_recv().ok())
    }

    /// Close the file; same as dropping it
    pub fn close(self) {}
}

impl fmt::Debug for FifoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FifoFile(handle={}, index={}, nonblocking={}, pos={}, async={})",
            self.handle,
            self.index,
            self.nonblocking,
            self.pos,
            self.events.is_some()
        )
    }
}

impl Drop for FifoFile {
    fn drop(&mut self) {
        self.gate.notifier().detach(self.handle);
        self.gate.wait_queue().unlist(self.handle);
        log::debug!("fifo{}: closed {}", self.index, self.handle);
    }
}

// Implement embedded_io traits
impl ErrorType for FifoFile {
    type Error = DeviceError;
}

impl Read for FifoFile {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        FifoFile::read(self, buf).await
    }
}

impl Write for FifoFile {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        FifoFile::write(self, buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
