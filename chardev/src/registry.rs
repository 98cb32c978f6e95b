//! InstanceRegistry - owns the N instances of one driver
//!
//! Instances are created together when the registry is initialised and
//! destroyed together on teardown. Activation is all-or-nothing: if any
//! instance or node fails, everything already built is unwound before the
//! error is returned.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::DeviceConfig;
use crate::error::DeviceError;
use crate::nodes::{DeviceNodes, Region};

/// A device kind the registry can manage
pub trait CharDevice: Send + Sync + Sized {
    /// Build instance `index`.
    ///
    /// # Errors
    /// `ResourceExhausted` if the instance cannot be allocated.
    fn create(index: usize, config: &DeviceConfig) -> Result<Self, DeviceError>;

    /// Wake everybody using the instance and refuse further use.
    fn shutdown(&self);
}

/// A constructed instance together with its published node
struct Slot<D> {
    device: Arc<D>,
    path: String,
}

pub struct InstanceRegistry<D: CharDevice, N: DeviceNodes> {
    nodes: Arc<N>,
    region: Option<Region>,
    slots: Vec<Slot<D>>,
    torn_down: bool,
}

impl<D: CharDevice, N: DeviceNodes> InstanceRegistry<D, N> {
    /// Register the device numbers and build every instance
    ///
    /// # Errors
    /// - `InvalidOperation` if `config` does not validate
    /// - `ResourceExhausted` if the region, any instance or any node cannot
    ///   be created. Nothing stays registered or published in that case.
    pub fn initialize(config: &DeviceConfig, nodes: Arc<N>) -> Result<Self, DeviceError> {
        if let Err(e) = config.validate() {
            error!(name = %config.name, "refusing invalid config: {e}");
            return Err(DeviceError::InvalidOperation);
        }
        let count = config.device_count();
        let region = nodes
            .register(&config.name, count, config.major)
            .map_err(|e| {
                error!(name = %config.name, "failed to register device region: {e}");
                DeviceError::ResourceExhausted
            })?;
        info!(name = %region.name, major = region.major, count, "device region registered");

        let mut registry = Self {
            nodes,
            region: Some(region),
            slots: Vec::with_capacity(count),
            torn_down: false,
        };

        for index in 0..count {
            if let Err(e) = registry.add_instance(index, config) {
                error!(index, "instance setup failed, unwinding {} instances", registry.slots.len());
                registry.release_all();
                registry.torn_down = true;
                return Err(e);
            }
        }

        info!(name = %config.name, count, "all instances ready");
        Ok(registry)
    }

    fn add_instance(&mut self, index: usize, config: &DeviceConfig) -> Result<(), DeviceError> {
        let Some(region) = self.region.as_ref() else {
            return Err(DeviceError::NoDevice);
        };
        let device = D::create(index, config)?;
        let path = match self.nodes.create_node(region, index) {
            Ok(path) => path,
            Err(e) => {
                warn!(index, "failed to create node: {e}");
                device.shutdown();
                return Err(DeviceError::ResourceExhausted);
            }
        };
        debug!(index, path = %path, "instance created");
        self.slots.push(Slot {
            device: Arc::new(device),
            path,
        });
        Ok(())
    }

    /// Shut down, unpublish and drop every instance, then release the region
    fn release_all(&mut self) {
        let Some(region) = self.region.take() else {
            return;
        };
        for (index, slot) in self.slots.drain(..).enumerate().rev() {
            slot.device.shutdown();
            self.nodes.destroy_node(&region, index);
            debug!(index, path = %slot.path, "instance released");
        }
        info!(name = %region.name, major = region.major, "device region unregistered");
        self.nodes.unregister(region);
    }

    /// Number of instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Instance `index`
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> &Arc<D> {
        &self.slot(index).device
    }

    /// Published node path of instance `index`
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn path(&self, index: usize) -> &str {
        &self.slot(index).path
    }

    fn slot(&self, index: usize) -> &Slot<D> {
        match self.slots.get(index) {
            Some(slot) => slot,
            None => panic!(
                "instance index {index} out of range (registry has {})",
                self.slots.len()
            ),
        }
    }

    #[must_use]
    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Destroy every instance
    ///
    /// Blocked callers are woken with `NoDevice`; `Arc`s to instances that
    /// callers still hold stay valid but refuse further blocking use.
    ///
    /// # Panics
    /// Panics if the registry was already torn down.
    pub fn teardown(&mut self) {
        assert!(!self.torn_down, "registry torn down twice");
        self.torn_down = true;
        info!("tearing down {} instances", self.slots.len());
        self.release_all();
    }
}

impl<D: CharDevice, N: DeviceNodes> Drop for InstanceRegistry<D, N> {
    fn drop(&mut self) {
        if !self.torn_down {
            self.teardown();
        }
    }
}

impl<D: CharDevice, N: DeviceNodes> fmt::Debug for InstanceRegistry<D, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<&str> = self.slots.iter().map(|s| s.path.as_str()).collect();
        f.debug_struct("InstanceRegistry")
            .field("region", &self.region)
            .field("paths", &paths)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}
