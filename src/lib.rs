//! USB device name enumerator
//!
//! A library and CLI tool that walks the USB topology of a Linux host and
//! prints the manufacturer and product name of every attached device.

pub mod config;
pub mod host;
pub mod model;
pub mod sysfs;
pub mod walker;

pub use config::Config;
pub use host::{HostError, HostSession, StringLookupError};
pub use model::{DeviceNode, DevicePath, DeviceRole};
pub use sysfs::SysfsSession;
pub use walker::{WalkError, WalkSummary, Walker};
