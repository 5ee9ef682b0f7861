//! Host session backed by the Linux sysfs USB tree.

use super::parser::SysfsParser;
use crate::host::{HostError, HostSession, StringLookupError};
use crate::model::DeviceNode;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// A snapshot of the sysfs USB topology. Strings are read from the device
/// directories on demand.
pub struct SysfsSession {
    base_path: PathBuf,
    root: DeviceNode,
}

impl SysfsSession {
    /// Open a session on a sysfs USB devices directory, normally
    /// `/sys/bus/usb/devices`.
    pub fn open_at(base_path: impl AsRef<Path>) -> Result<Self, HostError> {
        let base_path = base_path.as_ref().to_path_buf();

        let meta = std::fs::metadata(&base_path).map_err(|source| HostError::Unavailable {
            path: base_path.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(HostError::NotADirectory(base_path));
        }

        let root = SysfsParser::with_base_path(&base_path)
            .parse_topology()
            .map_err(|e| HostError::Enumeration(Box::new(e)))?;
        debug!(base = %base_path.display(), "opened sysfs USB session");

        Ok(Self { base_path, root })
    }
}

impl HostSession for SysfsSession {
    fn implementation_description(&self) -> String {
        format!("Linux sysfs USB host ({})", self.base_path.display())
    }

    fn implementation_version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn root_device(&self) -> &DeviceNode {
        &self.root
    }

    fn lookup_string(&self, device: &DeviceNode, index: u8) -> Result<String, StringLookupError> {
        if index == 0 {
            return Err(StringLookupError::NoString);
        }

        // sysfs only exposes the three strings the kernel caches at enumeration
        let desc = device.descriptor();
        let attr = if index == desc.manufacturer_string_index {
            "manufacturer"
        } else if index == desc.product_string_index {
            "product"
        } else if index == desc.serial_number_string_index {
            "serial"
        } else {
            return Err(StringLookupError::Unsupported {
                device: device.id.to_string(),
                index,
            });
        };

        let path = self.base_path.join(&device.id.0).join(attr);
        trace!(path = %path.display(), index, "reading string descriptor");
        match std::fs::read_to_string(&path) {
            // only the newline sysfs appends; the descriptor text is kept as is
            Ok(s) => Ok(s.strip_suffix('\n').unwrap_or(&s).to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StringLookupError::Unavailable {
                device: device.id.to_string(),
                index,
            }),
            Err(source) => Err(StringLookupError::Io {
                device: device.id.to_string(),
                index,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const KEYBOARD: [u8; 18] = [
        0x12, 0x01, 0x10, 0x01, 0x00, 0x00, 0x00, 0x08, 0xd9, 0x04, 0x03, 0x16, 0x00, 0x01, 0x01,
        0x02, 0x03, 0x01,
    ];

    fn session_with_keyboard() -> (TempDir, SysfsSession) {
        let tmp = TempDir::new().unwrap();
        let hub = tmp.path().join("usb1");
        fs::create_dir_all(&hub).unwrap();
        let mut hub_blob = KEYBOARD;
        hub_blob[4] = 0x09;
        fs::write(hub.join("descriptors"), hub_blob).unwrap();

        let dev = tmp.path().join("1-3");
        fs::create_dir_all(&dev).unwrap();
        fs::write(dev.join("descriptors"), KEYBOARD).unwrap();
        fs::write(dev.join("manufacturer"), "Holtek\n").unwrap();
        fs::write(dev.join("product"), "USB Keyboard \n").unwrap();

        let session = SysfsSession::open_at(tmp.path()).unwrap();
        (tmp, session)
    }

    fn keyboard(session: &SysfsSession) -> &DeviceNode {
        &session.root_device().attached_children()[0].attached_children()[0]
    }

    #[test]
    fn test_metadata() {
        let (tmp, session) = session_with_keyboard();
        assert!(
            session
                .implementation_description()
                .contains(&tmp.path().display().to_string())
        );
        assert_eq!(session.implementation_version(), env!("CARGO_PKG_VERSION"));
        assert_eq!(session.api_version(), crate::host::API_VERSION);
    }

    #[test]
    fn test_lookup_strings() {
        let (_tmp, session) = session_with_keyboard();
        let dev = keyboard(&session);
        assert_eq!(session.lookup_string(dev, 1).unwrap(), "Holtek");
        assert_eq!(session.lookup_string(dev, 2).unwrap(), "USB Keyboard ");
    }

    #[test]
    fn test_lookup_keeps_surrounding_spaces() {
        let (tmp, session) = session_with_keyboard();
        fs::write(tmp.path().join("1-3/manufacturer"), "  Acme  \n").unwrap();
        let dev = keyboard(&session);
        assert_eq!(session.lookup_string(dev, 1).unwrap(), "  Acme  ");
    }

    #[test]
    fn test_lookup_errors() {
        let (tmp, session) = session_with_keyboard();
        let dev = keyboard(&session);

        assert!(matches!(
            session.lookup_string(dev, 0),
            Err(StringLookupError::NoString)
        ));
        assert!(matches!(
            session.lookup_string(dev, 7),
            Err(StringLookupError::Unsupported { index: 7, .. })
        ));
        // serial index 3 has no attribute file
        assert!(matches!(
            session.lookup_string(dev, 3),
            Err(StringLookupError::Unavailable { index: 3, .. })
        ));

        fs::remove_file(tmp.path().join("1-3/product")).unwrap();
        fs::create_dir(tmp.path().join("1-3/product")).unwrap();
        assert!(matches!(
            session.lookup_string(dev, 2),
            Err(StringLookupError::Io { index: 2, .. })
        ));
    }

    #[test]
    fn test_open_missing_path() {
        let tmp = TempDir::new().unwrap();
        let err = SysfsSession::open_at(tmp.path().join("absent")).err().unwrap();
        assert!(matches!(err, HostError::Unavailable { .. }));
    }

    #[test]
    fn test_open_file_path() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "").unwrap();
        let err = SysfsSession::open_at(&file).err().unwrap();
        assert!(matches!(err, HostError::NotADirectory(_)));
    }
}
