//! USB data model types.

pub mod descriptor;
pub mod endpoint;
pub mod speed;
pub mod topology;

pub use descriptor::{
    BcdVersion, ConfigurationDescriptor, DescriptorError, DeviceDescriptor, InterfaceDescriptor,
    class_name, parse_descriptors,
};
pub use endpoint::{Direction, EndpointDescriptor, TransferType};
pub use speed::UsbSpeed;
pub use topology::{DeviceNode, DevicePath, DeviceRole, PortRef};
