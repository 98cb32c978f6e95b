//! Device-number regions and device nodes
//!
//! Publishing an instance (number allocation, class and node creation) is
//! somebody else's job; the registry only talks to it through
//! [`DeviceNodes`]. [`MemNodes`] keeps everything in memory and is what the
//! demo and the tests use.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

use crate::error::NodeError;

/// First major number handed out when dynamic allocation is requested
pub const FIRST_DYNAMIC_MAJOR: u32 = 240;

/// A registered range of device numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub major: u32,
    pub count: usize,
}

/// Trait for device-node backends
pub trait DeviceNodes: Send + Sync {
    /// Reserve `count` device numbers under `name`.
    ///
    /// `major == 0` asks the backend to choose one.
    fn register(&self, name: &str, count: usize, major: u32) -> Result<Region, NodeError>;

    /// Publish instance `index` of `region`, returning its path.
    fn create_node(&self, region: &Region, index: usize) -> Result<String, NodeError>;

    /// Remove the node of instance `index`.
    fn destroy_node(&self, region: &Region, index: usize);

    /// Release the device numbers.
    fn unregister(&self, region: Region);
}

#[derive(Debug)]
struct MemNodesState {
    regions: HashMap<u32, String>,
    nodes: BTreeMap<String, (u32, usize)>,
}

/// In-memory implementation of [`DeviceNodes`]
///
/// Nodes are published as `/dev/{name}{index}`.
#[derive(Debug)]
pub struct MemNodes {
    state: Mutex<MemNodesState>,
}

impl MemNodes {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemNodesState {
                regions: HashMap::new(),
                nodes: BTreeMap::new(),
            }),
        }
    }

    /// Paths of all live nodes, sorted
    #[must_use]
    pub fn node_paths(&self) -> Vec<String> {
        self.state.lock().nodes.keys().cloned().collect()
    }

    #[must_use]
    pub fn is_registered(&self, major: u32) -> bool {
        self.state.lock().regions.contains_key(&major)
    }

    #[must_use]
    pub fn region_count(&self) -> usize {
        self.state.lock().regions.len()
    }
}

impl Default for MemNodes {
    fn default() -> Self {
        Self::new()
    }
}

fn node_path(region: &Region, index: usize) -> String {
    format!("/dev/{}{index}", region.name)
}

impl DeviceNodes for MemNodes {
    fn register(&self, name: &str, count: usize, major: u32) -> Result<Region, NodeError> {
        let mut state = self.state.lock();
        let major = if major == 0 {
            let mut candidate = FIRST_DYNAMIC_MAJOR;
            while state.regions.contains_key(&candidate) {
                candidate += 1;
            }
            candidate
        } else if state.regions.contains_key(&major) {
            return Err(NodeError::RegionBusy {
                name: name.to_string(),
                major,
            });
        } else {
            major
        };
        state.regions.insert(major, name.to_string());
        Ok(Region {
            name: name.to_string(),
            major,
            count,
        })
    }

    fn create_node(&self, region: &Region, index: usize) -> Result<String, NodeError> {
        let path = node_path(region, index);
        let mut state = self.state.lock();
        if index >= region.count || state.nodes.contains_key(&path) {
            return Err(NodeError::CreateFailed {
                name: region.name.clone(),
                index,
            });
        }
        state.nodes.insert(path.clone(), (region.major, index));
        Ok(path)
    }

    fn destroy_node(&self, region: &Region, index: usize) {
        let path = node_path(region, index);
        if self.state.lock().nodes.remove(&path).is_none() {
            log::warn!("nodes.destroy: {path} does not exist");
        }
    }

    fn unregister(&self, region: Region) {
        if self.state.lock().regions.remove(&region.major).is_none() {
            log::warn!(
                "nodes.unregister: major {} ({}) not registered",
                region.major,
                region.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_major_allocation() {
        let nodes = MemNodes::new();
        let a = nodes.register("a", 1, 0).unwrap();
        let b = nodes.register("b", 1, 0).unwrap();
        assert_eq!(a.major, FIRST_DYNAMIC_MAJOR);
        assert_eq!(b.major, FIRST_DYNAMIC_MAJOR + 1);
    }

    #[test]
    fn test_fixed_major_conflict() {
        let nodes = MemNodes::new();
        nodes.register("a", 1, 100).unwrap();
        let err = nodes.register("b", 1, 100).unwrap_err();
        assert_eq!(
            err,
            NodeError::RegionBusy {
                name: "b".to_string(),
                major: 100
            }
        );
    }

    #[test]
    fn test_create_and_destroy_nodes() {
        let nodes = MemNodes::new();
        let region = nodes.register("awcloud", 2, 0).unwrap();
        assert_eq!(nodes.create_node(&region, 0).unwrap(), "/dev/awcloud0");
        assert_eq!(nodes.create_node(&region, 1).unwrap(), "/dev/awcloud1");
        assert!(nodes.create_node(&region, 1).is_err());
        assert!(nodes.create_node(&region, 2).is_err());

        nodes.destroy_node(&region, 0);
        assert_eq!(nodes.node_paths(), vec!["/dev/awcloud1".to_string()]);

        nodes.destroy_node(&region, 1);
        nodes.unregister(region);
        assert_eq!(nodes.region_count(), 0);
    }
}
