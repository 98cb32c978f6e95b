//! Byte storage for the devices
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  FifoDevice / WindowDevice          │
//! │  - open files, seek, ioctl          │
//! └─────────────────────────────────────┘
//!          ▲
//!          │ blocking FIFO goes through
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  SyncGate (coordination layer)      │
//! │  - one lock around the store        │
//! │  - wait queue: data / space         │
//! │  - notifier: readable / writable    │
//! └─────────────────────────────────────┘
//!          ▲
//!          │ owns exclusively
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  BufferCore / WindowCore            │
//! │  - fixed capacity, used_len         │
//! │  - no locking of its own            │
//! └─────────────────────────────────────┘
//! ```

pub mod buffer;
pub mod window;

pub use buffer::BufferCore;
pub use window::WindowCore;
