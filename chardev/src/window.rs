//! Plain memory-window device
//!
//! A fixed window that every open file addresses through its own position,
//! like an ordinary file of `capacity` bytes. Nothing blocks and nothing is
//! consumed. All access is serialised by one lock.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::DeviceConfig;
use crate::control::Control;
use crate::error::DeviceError;
use crate::io::WindowCore;
use crate::registry::CharDevice;
use crate::seek::{seek, SeekMode};

struct SharedWindow {
    core: Mutex<WindowCore>,
    capacity: usize,
    shut_down: AtomicBool,
    debug_hint: String,
}

impl SharedWindow {
    fn check_alive(&self) -> Result<(), DeviceError> {
        if self.shut_down.load(Ordering::Acquire) {
            Err(DeviceError::NoDevice)
        } else {
            Ok(())
        }
    }
}

/// One window instance
pub struct WindowDevice {
    index: usize,
    shared: Arc<SharedWindow>,
}

impl WindowDevice {
    /// # Errors
    /// Returns `ResourceExhausted` if the window cannot be allocated.
    pub fn new(index: usize, capacity: usize, debug_hint: &str) -> Result<Self, DeviceError> {
        Ok(Self {
            index,
            shared: Arc::new(SharedWindow {
                core: Mutex::new(WindowCore::with_capacity(capacity)?),
                capacity,
                shut_down: AtomicBool::new(false),
                debug_hint: debug_hint.to_string(),
            }),
        })
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    #[must_use]
    pub fn used_len(&self) -> usize {
        self.shared.core.lock().used_len()
    }

    /// # Errors
    /// `NoDevice` if the instance has been shut down.
    pub fn open(&self) -> Result<WindowFile, DeviceError> {
        self.shared.check_alive()?;
        Ok(WindowFile {
            shared: Arc::clone(&self.shared),
            pos: 0,
        })
    }
}

impl CharDevice for WindowDevice {
    fn create(index: usize, config: &DeviceConfig) -> Result<Self, DeviceError> {
        Self::new(index, config.capacity, &config.node_name(index))
    }

    fn shutdown(&self) {
        self.shared.shut_down.store(true, Ordering::Release);
    }
}

impl fmt::Debug for WindowDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WindowDevice(index={}, used={}, capacity={})",
            self.index,
            self.used_len(),
            self.shared.capacity
        )
    }
}

/// An open file on a [`WindowDevice`]
pub struct WindowFile {
    shared: Arc<SharedWindow>,
    pos: u64,
}

impl WindowFile {
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Read from the current position and advance it
    ///
    /// # Errors
    /// - `EndOfDevice` if the position is at or past the end and `buf` is
    ///   non-empty
    /// - `NoDevice` after shutdown
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        self.shared.check_alive()?;
        let count = self.shared.core.lock().read_at(self.cursor(), buf)?;
        self.pos += count as u64;
        Ok(count)
    }

    /// Write at the current position and advance it
    ///
    /// # Errors
    /// Same as [`WindowFile::read`].
    pub fn write(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        self.shared.check_alive()?;
        let count = self.shared.core.lock().write_at(self.cursor(), data)?;
        log::info!(
            "{}: wrote {count} bytes at {}",
            self.shared.debug_hint,
            self.pos
        );
        self.pos += count as u64;
        Ok(count)
    }

    /// Move the position; `RelativeToEnd` is measured from `used_len`
    ///
    /// # Errors
    /// `OutOfRange` if the new position would leave `[0, capacity]`; the
    /// position is unchanged.
    pub fn seek(&mut self, offset: i64, mode: SeekMode) -> Result<u64, DeviceError> {
        let used_len = self.shared.core.lock().used_len();
        self.pos = seek(self.pos, offset, mode, used_len, self.shared.capacity)?;
        Ok(self.pos)
    }

    /// Run a control command
    ///
    /// # Errors
    /// `InvalidOperation` for unknown command codes, `NoDevice` after shutdown.
    pub fn ioctl(&self, cmd: u32) -> Result<(), DeviceError> {
        match Control::from_raw(cmd)? {
            Control::Clear => {
                self.shared.check_alive()?;
                self.shared.core.lock().clear();
                log::info!("{}: window cleared", self.shared.debug_hint);
                Ok(())
            }
        }
    }

    /// Position as an index; positions never exceed the capacity
    fn cursor(&self) -> usize {
        usize::try_from(self.pos).unwrap_or(usize::MAX)
    }
}

impl fmt::Debug for WindowFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowFile(device={}, pos={})", self.shared.debug_hint, self.pos)
    }
}
