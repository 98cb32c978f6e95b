//! Device configuration
//!
//! The knobs the kernel modules take as module parameters, plus the buffer
//! size they hard-code. All fields have defaults, so `{}` is a valid config.

use serde::Deserialize;

/// Buffer length of every device instance unless configured otherwise
pub const DEFAULT_CAPACITY: usize = 4096;
pub const DEFAULT_NAME: &str = "awcloud";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("buffer capacity must be positive")]
    ZeroCapacity,

    #[error("device name must not be empty")]
    EmptyName,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Base name; instance `i` is published as `{name}{i}`
    pub name: String,
    /// Buffer length in bytes
    pub capacity: usize,
    /// Number of instances; 0 is treated as 1
    pub num_devices: usize,
    /// Requested major number; 0 lets the node registry pick one
    pub major: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
            num_devices: 1,
            major: 0,
        }
    }
}

impl DeviceConfig {
    /// Creates a `DeviceConfig` by reading JSON from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - There are I/O errors reading from the provided reader
    /// - The JSON input is invalid or has unknown fields
    /// - The resulting config fails [`DeviceConfig::validate`]
    pub fn from_reader(mut reader: impl embedded_io::Read) -> Result<Self, ConfigError> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match embedded_io::Read::read(&mut reader, &mut chunk) {
                Ok(0) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(e) => return Err(ConfigError::Read(format!("{e:?}"))),
            }
        }
        Self::from_json_slice(&buffer)
    }

    /// # Errors
    /// Same as [`DeviceConfig::from_reader`], minus the I/O part.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Self::from_json_slice(json.as_bytes())
    }

    fn from_json_slice(json: &[u8]) -> Result<Self, ConfigError> {
        let config: DeviceConfig = serde_json::from_slice(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `ZeroCapacity` or `EmptyName`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(())
    }

    /// Number of instances to create
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.num_devices.max(1)
    }

    /// Published name of instance `index`
    #[must_use]
    pub fn node_name(&self, index: usize) -> String {
        format!("{}{index}", self.name)
    }
}
