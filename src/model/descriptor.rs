//! Device, configuration and interface descriptors, and the parser for the
//! raw descriptor blob a device reports.

use super::endpoint::EndpointDescriptor;
use std::fmt;
use thiserror::Error;

pub const DEVICE_DESCRIPTOR_TYPE: u8 = 0x01;
pub const CONFIGURATION_DESCRIPTOR_TYPE: u8 = 0x02;
pub const INTERFACE_DESCRIPTOR_TYPE: u8 = 0x04;
pub const ENDPOINT_DESCRIPTOR_TYPE: u8 = 0x05;

/// bDeviceClass of a hub.
pub const HUB_CLASS: u8 = 0x09;

const DEVICE_DESCRIPTOR_LEN: usize = 18;
const CONFIGURATION_DESCRIPTOR_LEN: usize = 9;
const INTERFACE_DESCRIPTOR_LEN: usize = 9;
const ENDPOINT_DESCRIPTOR_LEN: usize = 7;

/// Errors raised while decoding a descriptor blob.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("descriptor truncated at offset {offset}: need {needed} bytes, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("invalid bLength {length} at offset {offset}")]
    InvalidLength { offset: usize, length: u8 },
    #[error("expected descriptor type {expected:#04x} at offset {offset}, found {found:#04x}")]
    UnexpectedType {
        offset: usize,
        expected: u8,
        found: u8,
    },
    #[error("{0} descriptor at offset {1} has no enclosing {2}")]
    Orphan(&'static str, usize, &'static str),
}

/// A binary-coded-decimal version number (bcdUSB, bcdDevice).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcdVersion(pub u16);

impl fmt::Display for BcdVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}.{:02x}", self.0 >> 8, self.0 & 0xFF)
    }
}

/// Standard device descriptor (USB 2.0 table 9-8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub usb_version: BcdVersion,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_version: BcdVersion,
    pub manufacturer_string_index: u8,
    pub product_string_index: u8,
    pub serial_number_string_index: u8,
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    /// Descriptor for the synthetic hub that sits above every bus root hub.
    pub fn virtual_root_hub() -> Self {
        Self {
            length: DEVICE_DESCRIPTOR_LEN as u8,
            descriptor_type: DEVICE_DESCRIPTOR_TYPE,
            usb_version: BcdVersion(0x0200),
            device_class: HUB_CLASS,
            device_subclass: 0,
            device_protocol: 0,
            max_packet_size0: 64,
            vendor_id: 0,
            product_id: 0,
            device_version: BcdVersion(0x0000),
            manufacturer_string_index: 0,
            product_string_index: 0,
            serial_number_string_index: 0,
            num_configurations: 0,
        }
    }

    pub fn is_hub(&self) -> bool {
        self.device_class == HUB_CLASS
    }

    fn parse(buf: &[u8]) -> Result<Self, DescriptorError> {
        require(buf, 0, DEVICE_DESCRIPTOR_LEN)?;
        if buf[1] != DEVICE_DESCRIPTOR_TYPE {
            return Err(DescriptorError::UnexpectedType {
                offset: 0,
                expected: DEVICE_DESCRIPTOR_TYPE,
                found: buf[1],
            });
        }
        if (buf[0] as usize) < DEVICE_DESCRIPTOR_LEN {
            return Err(DescriptorError::InvalidLength {
                offset: 0,
                length: buf[0],
            });
        }

        Ok(Self {
            length: buf[0],
            descriptor_type: buf[1],
            usb_version: BcdVersion(le16(buf, 2)),
            device_class: buf[4],
            device_subclass: buf[5],
            device_protocol: buf[6],
            max_packet_size0: buf[7],
            vendor_id: le16(buf, 8),
            product_id: le16(buf, 10),
            device_version: BcdVersion(le16(buf, 12)),
            manufacturer_string_index: buf[14],
            product_string_index: buf[15],
            serial_number_string_index: buf[16],
            num_configurations: buf[17],
        })
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device Descriptor:")?;
        writeln!(f, "  bLength                {:5}", self.length)?;
        writeln!(f, "  bDescriptorType        {:5}", self.descriptor_type)?;
        writeln!(f, "  bcdUSB                 {:>5}", self.usb_version.to_string())?;
        writeln!(
            f,
            "  bDeviceClass           {:5} {}",
            self.device_class,
            class_name(self.device_class)
        )?;
        writeln!(f, "  bDeviceSubClass        {:5}", self.device_subclass)?;
        writeln!(f, "  bDeviceProtocol        {:5}", self.device_protocol)?;
        writeln!(f, "  bMaxPacketSize0        {:5}", self.max_packet_size0)?;
        writeln!(f, "  idVendor              0x{:04x}", self.vendor_id)?;
        writeln!(f, "  idProduct             0x{:04x}", self.product_id)?;
        writeln!(f, "  bcdDevice              {:>5}", self.device_version.to_string())?;
        writeln!(f, "  iManufacturer          {:5}", self.manufacturer_string_index)?;
        writeln!(f, "  iProduct               {:5}", self.product_string_index)?;
        writeln!(f, "  iSerial                {:5}", self.serial_number_string_index)?;
        write!(f, "  bNumConfigurations     {:5}", self.num_configurations)
    }
}

/// Standard configuration descriptor (USB 2.0 table 9-10).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_string_index: u8,
    pub attributes: u8,
    /// bMaxPower in 2 mA units.
    pub max_power: u8,
    pub interfaces: Vec<InterfaceDescriptor>,
}

impl ConfigurationDescriptor {
    pub fn self_powered(&self) -> bool {
        self.attributes & 0x40 != 0
    }

    pub fn remote_wakeup(&self) -> bool {
        self.attributes & 0x20 != 0
    }

    pub fn max_power_ma(&self) -> u16 {
        self.max_power as u16 * 2
    }
}

impl fmt::Display for ConfigurationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration Descriptor:")?;
        writeln!(f, "  bLength                {:5}", self.length)?;
        writeln!(f, "  bDescriptorType        {:5}", self.descriptor_type)?;
        writeln!(f, "  wTotalLength          0x{:04x}", self.total_length)?;
        writeln!(f, "  bNumInterfaces         {:5}", self.num_interfaces)?;
        writeln!(f, "  bConfigurationValue    {:5}", self.configuration_value)?;
        writeln!(f, "  iConfiguration         {:5}", self.configuration_string_index)?;
        writeln!(f, "  bmAttributes            0x{:02x}", self.attributes)?;
        if self.self_powered() {
            writeln!(f, "    Self Powered")?;
        }
        if self.remote_wakeup() {
            writeln!(f, "    Remote Wakeup")?;
        }
        write!(f, "  MaxPower              {:5}mA", self.max_power_ma())
    }
}

/// Standard interface descriptor (USB 2.0 table 9-12).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface_string_index: u8,
    pub endpoints: Vec<EndpointDescriptor>,
}

impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Interface Descriptor:")?;
        writeln!(f, "  bLength                {:5}", self.length)?;
        writeln!(f, "  bDescriptorType        {:5}", self.descriptor_type)?;
        writeln!(f, "  bInterfaceNumber       {:5}", self.interface_number)?;
        writeln!(f, "  bAlternateSetting      {:5}", self.alternate_setting)?;
        writeln!(f, "  bNumEndpoints          {:5}", self.num_endpoints)?;
        writeln!(
            f,
            "  bInterfaceClass        {:5} {}",
            self.interface_class,
            class_name(self.interface_class)
        )?;
        writeln!(f, "  bInterfaceSubClass     {:5}", self.interface_subclass)?;
        writeln!(f, "  bInterfaceProtocol     {:5}", self.interface_protocol)?;
        write!(f, "  iInterface             {:5}", self.interface_string_index)
    }
}

/// Human-readable name of a USB class code.
pub fn class_name(class: u8) -> &'static str {
    match class {
        0x00 => "(Defined at Interface level)",
        0x01 => "Audio",
        0x02 => "Communications",
        0x03 => "Human Interface Device",
        0x05 => "Physical",
        0x06 => "Image",
        0x07 => "Printer",
        0x08 => "Mass Storage",
        0x09 => "Hub",
        0x0a => "CDC Data",
        0x0b => "Chip/SmartCard",
        0x0d => "Content Security",
        0x0e => "Video",
        0x0f => "Personal Healthcare",
        0x10 => "Audio/Video",
        0x11 => "Billboard",
        0x12 => "USB Type-C Bridge",
        0xdc => "Diagnostic",
        0xe0 => "Wireless",
        0xef => "Miscellaneous Device",
        0xfe => "Application Specific Interface",
        0xff => "Vendor Specific Class",
        _ => "Unknown",
    }
}

/// Decode a raw descriptor blob: one device descriptor followed by the full
/// descriptor sets of zero or more configurations.
///
/// Class- and vendor-specific descriptors are skipped by length.
pub fn parse_descriptors(
    buf: &[u8],
) -> Result<(DeviceDescriptor, Vec<ConfigurationDescriptor>), DescriptorError> {
    let device = DeviceDescriptor::parse(buf)?;
    let mut configurations: Vec<ConfigurationDescriptor> = Vec::new();

    let mut offset = device.length as usize;
    while offset < buf.len() {
        require(buf, offset, 2)?;
        let length = buf[offset];
        if length < 2 {
            return Err(DescriptorError::InvalidLength { offset, length });
        }
        let desc = require(buf, offset, length as usize)?;

        match desc[1] {
            CONFIGURATION_DESCRIPTOR_TYPE => {
                require_len(desc, offset, CONFIGURATION_DESCRIPTOR_LEN)?;
                configurations.push(ConfigurationDescriptor {
                    length: desc[0],
                    descriptor_type: desc[1],
                    total_length: le16(desc, 2),
                    num_interfaces: desc[4],
                    configuration_value: desc[5],
                    configuration_string_index: desc[6],
                    attributes: desc[7],
                    max_power: desc[8],
                    interfaces: Vec::new(),
                });
            }
            INTERFACE_DESCRIPTOR_TYPE => {
                require_len(desc, offset, INTERFACE_DESCRIPTOR_LEN)?;
                let config = configurations.last_mut().ok_or(DescriptorError::Orphan(
                    "interface",
                    offset,
                    "configuration",
                ))?;
                config.interfaces.push(InterfaceDescriptor {
                    length: desc[0],
                    descriptor_type: desc[1],
                    interface_number: desc[2],
                    alternate_setting: desc[3],
                    num_endpoints: desc[4],
                    interface_class: desc[5],
                    interface_subclass: desc[6],
                    interface_protocol: desc[7],
                    interface_string_index: desc[8],
                    endpoints: Vec::new(),
                });
            }
            ENDPOINT_DESCRIPTOR_TYPE => {
                require_len(desc, offset, ENDPOINT_DESCRIPTOR_LEN)?;
                let interface = configurations
                    .last_mut()
                    .and_then(|c| c.interfaces.last_mut())
                    .ok_or(DescriptorError::Orphan("endpoint", offset, "interface"))?;
                interface.endpoints.push(EndpointDescriptor {
                    length: desc[0],
                    descriptor_type: desc[1],
                    address: desc[2],
                    attributes: desc[3],
                    max_packet_size: le16(desc, 4),
                    interval: desc[6],
                });
            }
            _ => {}
        }

        offset += length as usize;
    }

    Ok((device, configurations))
}

fn require(buf: &[u8], offset: usize, needed: usize) -> Result<&[u8], DescriptorError> {
    let available = buf.len().saturating_sub(offset);
    if available < needed {
        return Err(DescriptorError::Truncated {
            offset,
            needed,
            available,
        });
    }
    Ok(&buf[offset..offset + needed])
}

fn require_len(desc: &[u8], offset: usize, min: usize) -> Result<(), DescriptorError> {
    if desc.len() < min {
        return Err(DescriptorError::InvalidLength {
            offset,
            length: desc[0],
        });
    }
    Ok(())
}

fn le16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::endpoint::{Direction, TransferType};

    // Device descriptor of a full-speed HID mouse, vid 046d pid c077.
    const MOUSE_DEVICE: [u8; 18] = [
        0x12, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x08, 0x6d, 0x04, 0x77, 0xc0, 0x00, 0x72, 0x01,
        0x02, 0x00, 0x01,
    ];

    const MOUSE_CONFIG: [u8; 34] = [
        // configuration
        0x09, 0x02, 0x22, 0x00, 0x01, 0x01, 0x00, 0xa0, 0x32, //
        // interface 0, HID boot mouse
        0x09, 0x04, 0x00, 0x00, 0x01, 0x03, 0x01, 0x02, 0x00, //
        // HID class descriptor
        0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0x34, 0x00, //
        // endpoint 0x81 interrupt
        0x07, 0x05, 0x81, 0x03, 0x04, 0x00, 0x0a,
    ];

    fn mouse_blob() -> Vec<u8> {
        let mut blob = MOUSE_DEVICE.to_vec();
        blob.extend_from_slice(&MOUSE_CONFIG);
        blob
    }

    #[test]
    fn test_parse_device_descriptor() {
        let (device, configs) = parse_descriptors(&MOUSE_DEVICE).unwrap();
        assert_eq!(device.vendor_id, 0x046d);
        assert_eq!(device.product_id, 0xc077);
        assert_eq!(device.usb_version, BcdVersion(0x0200));
        assert_eq!(device.manufacturer_string_index, 1);
        assert_eq!(device.product_string_index, 2);
        assert_eq!(device.serial_number_string_index, 0);
        assert!(!device.is_hub());
        assert!(configs.is_empty());
    }

    #[test]
    fn test_parse_full_tree_skips_class_descriptors() {
        let (_, configs) = parse_descriptors(&mouse_blob()).unwrap();
        assert_eq!(configs.len(), 1);

        let config = &configs[0];
        assert_eq!(config.total_length, 0x22);
        assert_eq!(config.max_power_ma(), 100);
        assert!(config.remote_wakeup());
        assert!(!config.self_powered());
        assert_eq!(config.interfaces.len(), 1);

        let interface = &config.interfaces[0];
        assert_eq!(interface.interface_class, 0x03);
        assert_eq!(interface.endpoints.len(), 1);

        let ep = &interface.endpoints[0];
        assert_eq!(ep.direction(), Direction::In);
        assert_eq!(ep.transfer_type(), TransferType::Interrupt);
        assert_eq!(ep.max_packet_size, 4);
        assert_eq!(ep.interval, 10);
    }

    #[test]
    fn test_truncated_device_descriptor() {
        let err = parse_descriptors(&MOUSE_DEVICE[..10]).unwrap_err();
        assert_eq!(
            err,
            DescriptorError::Truncated {
                offset: 0,
                needed: 18,
                available: 10
            }
        );
    }

    #[test]
    fn test_truncated_configuration() {
        let blob = mouse_blob();
        let err = parse_descriptors(&blob[..blob.len() - 3]).unwrap_err();
        assert!(matches!(err, DescriptorError::Truncated { offset: 45, .. }));
    }

    #[test]
    fn test_zero_length_descriptor_is_rejected() {
        let mut blob = MOUSE_DEVICE.to_vec();
        blob.extend_from_slice(&[0x00, 0x02]);
        let err = parse_descriptors(&blob).unwrap_err();
        assert_eq!(
            err,
            DescriptorError::InvalidLength {
                offset: 18,
                length: 0
            }
        );
    }

    #[test]
    fn test_endpoint_without_interface() {
        let mut blob = MOUSE_DEVICE.to_vec();
        blob.extend_from_slice(&MOUSE_CONFIG[..9]);
        blob.extend_from_slice(&MOUSE_CONFIG[27..]);
        let err = parse_descriptors(&blob).unwrap_err();
        assert_eq!(err, DescriptorError::Orphan("endpoint", 27, "interface"));
    }

    #[test]
    fn test_wrong_leading_type() {
        let mut blob = MOUSE_DEVICE;
        blob[1] = 0x02;
        let err = parse_descriptors(&blob).unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::UnexpectedType { found: 0x02, .. }
        ));
    }

    #[test]
    fn test_bcd_display() {
        assert_eq!(BcdVersion(0x0200).to_string(), "2.00");
        assert_eq!(BcdVersion(0x0110).to_string(), "1.10");
        assert_eq!(BcdVersion(0x0310).to_string(), "3.10");
        assert_eq!(BcdVersion(0x7200).to_string(), "72.00");
    }

    #[test]
    fn test_device_display() {
        let (device, _) = parse_descriptors(&MOUSE_DEVICE).unwrap();
        let text = device.to_string();
        assert!(text.starts_with("Device Descriptor:"));
        assert!(text.contains("idVendor              0x046d"));
        assert!(text.contains("bcdUSB                  2.00"));
    }

    #[test]
    fn test_virtual_root_is_hub() {
        let root = DeviceDescriptor::virtual_root_hub();
        assert!(root.is_hub());
        assert_eq!(root.manufacturer_string_index, 0);
    }
}
