pub mod config;
pub mod control;
pub mod error;
pub mod fifo;
pub mod gate;
pub mod idgen;
pub mod io;
pub mod nodes;
pub mod notifier;
pub mod readiness;
pub mod registry;
pub mod seek;
pub mod wait_queue;
pub mod window;

// Re-export device types for convenience
pub use fifo::{FifoDevice, FifoFile, Interrupter, OpenMode};
pub use window::{WindowDevice, WindowFile};

// Re-export coordination types for convenience
pub use gate::SyncGate;
pub use notifier::{Notifier, PollEvent, EVENT_QUEUE_DEPTH};
pub use readiness::Readiness;
pub use wait_queue::{Condition, WaitFuture, WaitQueueArc, WakeReason};

// Re-export lifecycle types for convenience
pub use config::{ConfigError, DeviceConfig};
pub use nodes::{DeviceNodes, MemNodes, Region};
pub use registry::{CharDevice, InstanceRegistry};

pub use control::MEM_CLEAR;
pub use error::{DeviceError, NodeError};
pub use idgen::{Handle, IdGen};
pub use seek::SeekMode;
