//! Sysfs parser for the USB device tree.

use crate::model::{
    DescriptorError, DeviceDescriptor, DeviceNode, DevicePath, DeviceRole, PortRef, UsbSpeed,
    parse_descriptors,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const SYSFS_USB_DEVICES: &str = "/sys/bus/usb/devices";

/// Errors that can occur during sysfs parsing.
#[derive(Debug, Error)]
pub enum SysfsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error for attribute '{0}': {1}")]
    Parse(String, String),
    #[error("Bad descriptors for {0}: {1}")]
    Descriptor(String, #[source] DescriptorError),
}

/// Parser for Linux sysfs USB device information.
pub struct SysfsParser {
    base_path: PathBuf,
}

impl SysfsParser {
    /// Create a parser rooted at `base_path`.
    pub fn with_base_path(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Parse the complete USB topology, returning the virtual root hub.
    ///
    /// Devices that fail to parse are reported and left out, along with
    /// everything plugged in below them.
    pub fn parse_topology(&self) -> Result<DeviceNode, SysfsError> {
        let mut nodes: HashMap<DevicePath, DeviceNode> = HashMap::new();

        // First pass: parse root hubs (usbN) and devices ("3-1", "3-1.2";
        // interface directories contain ':')
        for entry in std::fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();

            let is_root_hub = name
                .strip_prefix("usb")
                .is_some_and(|n| n.parse::<u8>().is_ok());
            let is_device = name.contains('-') && !name.contains(':');
            if !is_root_hub && !is_device {
                continue;
            }

            match self.parse_device(&name) {
                Ok(device) => {
                    nodes.insert(device.id.clone(), device);
                }
                Err(e) => {
                    warn!(device = %name, error = %e, "failed to parse device");
                }
            }
        }

        // Second pass: group children under their parent, in port order
        let mut children: HashMap<DevicePath, Vec<DevicePath>> = HashMap::new();
        let mut root_hubs: Vec<DevicePath> = Vec::new();
        for path in nodes.keys() {
            match path.parent() {
                Some(parent) => children.entry(parent).or_default().push(path.clone()),
                None => root_hubs.push(path.clone()),
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|p| p.port_number());
        }
        root_hubs.sort_by_key(|p| p.bus_num());

        // Third pass: assemble the tree under a virtual root
        let mut buses = Vec::with_capacity(root_hubs.len());
        for path in &root_hubs {
            if let Some(hub) = assemble(path, &mut nodes, &children) {
                buses.push(hub);
            }
        }

        for orphan in nodes.keys() {
            warn!(device = %orphan, "device has no parsable parent hub; skipping");
        }

        let root = DeviceNode {
            id: DevicePath::virtual_root(),
            bus_number: 0,
            address: 0,
            speed: None,
            descriptor: DeviceDescriptor::virtual_root_hub(),
            configurations: Vec::new(),
            parent: None,
            role: DeviceRole::Hub { children: buses },
        };
        debug!(
            devices = root.subtree_len() - 1,
            base = %self.base_path.display(),
            "parsed USB topology"
        );
        Ok(root)
    }

    /// Parse a root hub or device directory. The node comes back without
    /// children.
    fn parse_device(&self, name: &str) -> Result<DeviceNode, SysfsError> {
        let path = self.base_path.join(name);
        let id = DevicePath::new(name);

        let raw = std::fs::read(path.join("descriptors"))?;
        let (descriptor, configurations) =
            parse_descriptors(&raw).map_err(|e| SysfsError::Descriptor(name.to_string(), e))?;

        let bus_number = match self.read_attr_u8(&path, "busnum") {
            Ok(n) => n,
            Err(_) => id.bus_num().unwrap_or(0),
        };
        let address = self.read_attr_u8(&path, "devnum").unwrap_or(0);
        let speed = self
            .read_attr_string(&path, "speed")
            .ok()
            .and_then(|s| UsbSpeed::from_sysfs(&s));

        let parent = match (id.parent(), id.port_number()) {
            (Some(hub), Some(port_number)) => Some(PortRef { port_number, hub }),
            _ => None,
        };

        let role = if descriptor.is_hub() {
            DeviceRole::Hub {
                children: Vec::new(),
            }
        } else {
            DeviceRole::Function
        };

        Ok(DeviceNode {
            id,
            bus_number,
            address,
            speed,
            descriptor,
            configurations,
            parent,
            role,
        })
    }

    // Helper methods for reading sysfs attributes

    fn read_attr_string(&self, path: &Path, attr: &str) -> Result<String, SysfsError> {
        let content = std::fs::read_to_string(path.join(attr))?;
        Ok(content)
    }

    fn read_attr_u8(&self, path: &Path, attr: &str) -> Result<u8, SysfsError> {
        let content = std::fs::read_to_string(path.join(attr))?;
        content
            .trim()
            .parse()
            .map_err(|e| SysfsError::Parse(attr.to_string(), format!("{}", e)))
    }
}

/// Move `path` out of `nodes` and attach its subtree.
fn assemble(
    path: &DevicePath,
    nodes: &mut HashMap<DevicePath, DeviceNode>,
    children: &HashMap<DevicePath, Vec<DevicePath>>,
) -> Option<DeviceNode> {
    let mut node = nodes.remove(path)?;
    let Some(child_paths) = children.get(path) else {
        return Some(node);
    };

    match &mut node.role {
        DeviceRole::Hub { children: attached } => {
            for child_path in child_paths {
                if let Some(child) = assemble(child_path, nodes, children) {
                    attached.push(child);
                }
            }
        }
        DeviceRole::Function => {
            warn!(device = %path, "non-hub device reports attached children");
        }
    }
    Some(node)
}
