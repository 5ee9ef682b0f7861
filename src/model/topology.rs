//! USB topology data structures.

use super::descriptor::{ConfigurationDescriptor, DeviceDescriptor};
use super::speed::UsbSpeed;

/// Unique device identifier: bus-port.port.port..., `usbN` for a bus root
/// hub, or `root` for the virtual root hub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePath(pub String);

/// Identifier of the virtual root hub above all bus root hubs.
pub const VIRTUAL_ROOT: &str = "root";

impl DevicePath {
    /// Create a new device path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Path of the virtual root hub.
    pub fn virtual_root() -> Self {
        Self(VIRTUAL_ROOT.to_string())
    }

    /// Get parent device path.
    /// Examples:
    /// - "3-1.2.3" -> "3-1.2"
    /// - "3-1.2" -> "3-1"
    /// - "3-1" -> "usb3" (root hub)
    /// - "usb3" -> None
    pub fn parent(&self) -> Option<DevicePath> {
        if let Some(pos) = self.0.rfind('.') {
            Some(DevicePath(self.0[..pos].to_string()))
        } else {
            self.0
                .rfind('-')
                .map(|pos| DevicePath(format!("usb{}", &self.0[..pos])))
        }
    }

    /// Port on the parent hub this device is plugged into
    /// ("3-1.2" -> 2, "3-4" -> 4). None for root hubs.
    pub fn port_number(&self) -> Option<u8> {
        let tail = match self.0.rfind('.') {
            Some(pos) => &self.0[pos + 1..],
            None => self.port_path()?,
        };
        tail.parse().ok()
    }

    /// Get bus number from path.
    pub fn bus_num(&self) -> Option<u8> {
        self.0
            .strip_prefix("usb")
            .or_else(|| self.0.split('-').next())
            .and_then(|s| s.parse().ok())
    }

    /// Port path within bus (e.g., "3-1.2.3" -> "1.2.3").
    pub fn port_path(&self) -> Option<&str> {
        self.0.split('-').nth(1)
    }
}

impl std::fmt::Display for DevicePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The port a device is attached to. Refers to the hub by path only; the
/// hub node itself is owned by the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRef {
    pub port_number: u8,
    pub hub: DevicePath,
}

impl PortRef {
    pub fn port_number(&self) -> u8 {
        self.port_number
    }

    pub fn hub(&self) -> &DevicePath {
        &self.hub
    }
}

/// Whether a device provides downstream ports.
#[derive(Debug, Clone)]
pub enum DeviceRole {
    /// A hub, with its attached devices in port order.
    Hub { children: Vec<DeviceNode> },
    /// A non-hub (function) device.
    Function,
}

/// A USB device in the host topology (includes hubs).
#[derive(Debug, Clone)]
pub struct DeviceNode {
    /// Sysfs path identifier (e.g., "3-1.2").
    pub id: DevicePath,
    /// Bus number (0 for the virtual root hub).
    pub bus_number: u8,
    /// Device address on the bus.
    pub address: u8,
    /// Negotiated speed, if the host reports one.
    pub speed: Option<UsbSpeed>,
    pub descriptor: DeviceDescriptor,
    /// Configurations with their interfaces and endpoints.
    pub configurations: Vec<ConfigurationDescriptor>,
    /// Port on the parent hub, if any.
    pub parent: Option<PortRef>,
    pub role: DeviceRole,
}

impl DeviceNode {
    pub fn is_hub(&self) -> bool {
        matches!(self.role, DeviceRole::Hub { .. })
    }

    /// Devices attached to this hub. Empty for function devices.
    pub fn attached_children(&self) -> &[DeviceNode] {
        match &self.role {
            DeviceRole::Hub { children } => children,
            DeviceRole::Function => &[],
        }
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn configurations(&self) -> &[ConfigurationDescriptor] {
        &self.configurations
    }

    pub fn parent_port(&self) -> Option<&PortRef> {
        self.parent.as_ref()
    }

    /// Format VID:PID as string.
    pub fn vid_pid(&self) -> String {
        format!(
            "{:04x}:{:04x}",
            self.descriptor.vendor_id, self.descriptor.product_id
        )
    }

    /// Number of devices in this subtree, this one included.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .attached_children()
            .iter()
            .map(DeviceNode::subtree_len)
            .sum::<usize>()
    }
}

impl std::fmt::Display for DeviceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bus {:03} Device {:03}: ID {}",
            self.bus_number,
            self.address,
            self.vid_pid()
        )?;
        if let Some(speed) = self.speed {
            write!(f, " {}", speed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str) -> DeviceNode {
        DeviceNode {
            id: DevicePath::new(id),
            bus_number: 1,
            address: 2,
            speed: Some(UsbSpeed::Full),
            descriptor: DeviceDescriptor {
                vendor_id: 0x046d,
                product_id: 0xc077,
                device_class: 0,
                ..DeviceDescriptor::virtual_root_hub()
            },
            configurations: Vec::new(),
            parent: None,
            role: DeviceRole::Function,
        }
    }

    #[test]
    fn test_device_path_parent() {
        let path = DevicePath::new("3-1.2.3");
        assert_eq!(path.parent(), Some(DevicePath::new("3-1.2")));

        let path2 = DevicePath::new("3-1");
        assert_eq!(path2.parent(), Some(DevicePath::new("usb3")));

        assert_eq!(DevicePath::new("usb3").parent(), None);
    }

    #[test]
    fn test_device_path_port_number() {
        assert_eq!(DevicePath::new("3-1.2.3").port_number(), Some(3));
        assert_eq!(DevicePath::new("3-4").port_number(), Some(4));
        assert_eq!(DevicePath::new("usb3").port_number(), None);
    }

    #[test]
    fn test_device_path_bus_num() {
        assert_eq!(DevicePath::new("3-1.2").bus_num(), Some(3));
        assert_eq!(DevicePath::new("usb12").bus_num(), Some(12));
        assert_eq!(DevicePath::virtual_root().bus_num(), None);
    }

    #[test]
    fn test_function_has_no_children() {
        let node = leaf("1-1");
        assert!(!node.is_hub());
        assert!(node.attached_children().is_empty());
        assert_eq!(node.subtree_len(), 1);
    }

    #[test]
    fn test_hub_children_and_display() {
        let hub = DeviceNode {
            role: DeviceRole::Hub {
                children: vec![leaf("1-1.1"), leaf("1-1.2")],
            },
            ..leaf("1-1")
        };
        assert!(hub.is_hub());
        assert_eq!(hub.attached_children().len(), 2);
        assert_eq!(hub.subtree_len(), 3);
        assert_eq!(
            hub.to_string(),
            "Bus 001 Device 002: ID 046d:c077 Full Speed (12 Mbps)"
        );
    }
}
