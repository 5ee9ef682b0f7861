//! Abstraction over the host's USB stack: the session the topology walker
//! reads devices and strings through.

use crate::model::DeviceNode;
use std::path::PathBuf;
use thiserror::Error;

/// Version of the session interface reported in the header.
pub const API_VERSION: &str = "1.0";

/// Failure to acquire the host USB stack.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("USB host unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("USB host unavailable at {0}: not a directory")]
    NotADirectory(PathBuf),
    #[error("enumerating USB devices: {0}")]
    Enumeration(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure to resolve one string descriptor of one device.
#[derive(Debug, Error)]
pub enum StringLookupError {
    #[error("string descriptor index 0 does not name a string")]
    NoString,
    #[error("string descriptor {index} of {device} is not exposed by the host")]
    Unsupported { device: String, index: u8 },
    #[error("string descriptor {index} of {device} could not be read from the device")]
    Unavailable { device: String, index: u8 },
    #[error("reading string descriptor {index} of {device}: {source}")]
    Io {
        device: String,
        index: u8,
        #[source]
        source: std::io::Error,
    },
}

/// An open connection to the host's USB stack.
///
/// The session owns every [`DeviceNode`] it hands out; nodes borrowed from it
/// cannot outlive it.
pub trait HostSession {
    /// Human-readable description of the implementation behind this session.
    fn implementation_description(&self) -> String;

    fn implementation_version(&self) -> String;

    fn api_version(&self) -> String {
        API_VERSION.to_string()
    }

    /// The virtual root hub; its children are the bus root hubs.
    fn root_device(&self) -> &DeviceNode;

    /// Resolve a string descriptor index of `device` to text. Blocks until
    /// the host answers.
    fn lookup_string(&self, device: &DeviceNode, index: u8) -> Result<String, StringLookupError>;
}
