//! Topology walker: prints device names, or the full descriptor tree.

use crate::host::{HostSession, StringLookupError};
use crate::model::{DeviceNode, DeviceRole};
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix of the line written for a device whose name could not be read.
pub const SKIPPED_PREFIX: &str = "Ignoring problematic device: ";

/// Separator written after each device in the descriptor tree dump.
pub const TREE_SEPARATOR: &str = "-----";

#[derive(Debug, Error)]
pub enum WalkError {
    #[error(transparent)]
    Lookup(#[from] StringLookupError),
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
}

/// Counts of what a name walk produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub hubs: usize,
    pub named: usize,
    pub unnamed: usize,
    pub skipped: usize,
}

/// Walks the topology of one host session, writing to `out`.
pub struct Walker<'s, S: HostSession + ?Sized, W: Write> {
    session: &'s S,
    out: W,
    summary: WalkSummary,
}

impl<'s, S: HostSession + ?Sized, W: Write> Walker<'s, S, W> {
    pub fn new(session: &'s S, out: W) -> Self {
        Self {
            session,
            out,
            summary: WalkSummary::default(),
        }
    }

    pub fn summary(&self) -> WalkSummary {
        self.summary
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print the name of every non-hub device below `device`, depth first in
    /// the order the host lists children.
    ///
    /// A device whose strings cannot be read is reported and skipped; the
    /// walk carries on with its siblings. Only output errors abort the walk.
    pub fn enumerate_names(&mut self, device: &DeviceNode) -> Result<(), WalkError> {
        match &device.role {
            DeviceRole::Hub { children } => {
                self.summary.hubs += 1;
                for child in children {
                    self.enumerate_names(child)?;
                }
            }
            DeviceRole::Function => match self.dump_name(device) {
                Ok(true) => self.summary.named += 1,
                Ok(false) => self.summary.unnamed += 1,
                Err(WalkError::Lookup(e)) => {
                    warn!(device = %device.id, error = %e, "skipping device");
                    writeln!(self.out, "{}{}", SKIPPED_PREFIX, e)?;
                    self.summary.skipped += 1;
                }
                Err(e) => return Err(e),
            },
        }
        Ok(())
    }

    /// Print `"<manufacturer> <product>"` for one device.
    ///
    /// Returns false without printing when the device has no manufacturer or
    /// no product string. Lookup failures are returned to the caller.
    pub fn dump_name(&mut self, device: &DeviceNode) -> Result<bool, WalkError> {
        let desc = device.descriptor();
        let i_manufacturer = desc.manufacturer_string_index;
        let i_product = desc.product_string_index;

        if i_manufacturer == 0 || i_product == 0 {
            debug!(device = %device.id, "no name strings");
            return Ok(false);
        }

        let manufacturer = self.session.lookup_string(device, i_manufacturer)?;
        let product = self.session.lookup_string(device, i_product)?;
        writeln!(self.out, "{} {}", manufacturer, product)?;
        Ok(true)
    }

    /// Print `device` with its port, every descriptor it carries and, for a
    /// hub, the same for every attached device.
    ///
    /// Nothing is skipped here: the first failure ends the dump.
    pub fn dump_device_tree(&mut self, device: &DeviceNode) -> Result<(), WalkError> {
        writeln!(self.out, "{}", device)?;

        if let Some(port) = device.parent_port() {
            writeln!(self.out, "Connected to port: {}", port.port_number())?;
            writeln!(self.out, "Parent: {}", port.hub())?;
        }

        writeln!(self.out, "{}", device.descriptor())?;
        self.dump_strings(device)?;

        for configuration in device.configurations() {
            writeln!(self.out, "{}", configuration)?;
            for interface in &configuration.interfaces {
                writeln!(self.out, "{}", interface)?;
                for endpoint in &interface.endpoints {
                    writeln!(self.out, "{}", endpoint)?;
                }
            }
        }

        writeln!(self.out, "{}", TREE_SEPARATOR)?;

        if let DeviceRole::Hub { children } = &device.role {
            writeln!(self.out, "Is usb hub!")?;
            for child in children {
                self.dump_device_tree(child)?;
            }
        }
        Ok(())
    }

    fn dump_strings(&mut self, device: &DeviceNode) -> Result<(), WalkError> {
        let desc = device.descriptor();
        let strings = [
            ("Manufacturer", desc.manufacturer_string_index),
            ("Product", desc.product_string_index),
            ("Serial", desc.serial_number_string_index),
        ];
        for (label, index) in strings {
            if index == 0 {
                continue;
            }
            let value = self.session.lookup_string(device, index)?;
            writeln!(self.out, "  {:<22} {}", label, value)?;
        }
        Ok(())
    }
}

/// Write the session metadata lines and a blank line.
pub fn write_header<S, W>(session: &S, out: &mut W) -> io::Result<()>
where
    S: HostSession + ?Sized,
    W: Write + ?Sized,
{
    writeln!(
        out,
        "USB Service Implementation: {}",
        session.implementation_description()
    )?;
    writeln!(
        out,
        "Implementation version: {}",
        session.implementation_version()
    )?;
    writeln!(out, "Service API version: {}", session.api_version())?;
    writeln!(out)
}
