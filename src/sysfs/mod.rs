//! Linux sysfs USB host provider.

mod parser;
mod session;

pub use parser::{SYSFS_USB_DEVICES, SysfsError, SysfsParser};
pub use session::SysfsSession;
