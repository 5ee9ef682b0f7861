//! USB endpoint descriptor.

use std::fmt;

/// USB transfer types, from bits 1:0 of bmAttributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

impl TransferType {
    /// Decode from an endpoint's bmAttributes field.
    pub fn from_attributes(attributes: u8) -> Self {
        match attributes & 0x03 {
            0 => Self::Control,
            1 => Self::Isochronous,
            2 => Self::Bulk,
            _ => Self::Interrupt,
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Control => "Control",
            Self::Isochronous => "Isochronous",
            Self::Bulk => "Bulk",
            Self::Interrupt => "Interrupt",
        };
        write!(f, "{}", name)
    }
}

/// Endpoint direction, from bit 7 of bEndpointAddress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Decode from an endpoint address.
    pub fn from_address(address: u8) -> Self {
        if address & 0x80 != 0 { Self::In } else { Self::Out }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "IN"),
            Self::Out => write!(f, "OUT"),
        }
    }
}

/// Standard endpoint descriptor (USB 2.0 table 9-13).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    /// Endpoint address (e.g., 0x81 = IN endpoint 1, 0x02 = OUT endpoint 2).
    pub address: u8,
    pub attributes: u8,
    /// Raw wMaxPacketSize. For high-speed, bits 12:11 hold the multiplier.
    pub max_packet_size: u16,
    /// Polling interval (raw bInterval).
    pub interval: u8,
}

impl EndpointDescriptor {
    /// Endpoint number (address without direction bit).
    pub fn number(&self) -> u8 {
        self.address & 0x0F
    }

    pub fn direction(&self) -> Direction {
        Direction::from_address(self.address)
    }

    pub fn transfer_type(&self) -> TransferType {
        TransferType::from_attributes(self.attributes)
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Endpoint Descriptor:")?;
        writeln!(f, "  bLength                {:5}", self.length)?;
        writeln!(f, "  bDescriptorType        {:5}", self.descriptor_type)?;
        writeln!(
            f,
            "  bEndpointAddress        0x{:02x}  EP {} {}",
            self.address,
            self.number(),
            self.direction()
        )?;
        writeln!(f, "  bmAttributes           {:5}", self.attributes)?;
        writeln!(f, "    Transfer Type          {}", self.transfer_type())?;
        writeln!(
            f,
            "  wMaxPacketSize        0x{:04x}  {} bytes",
            self.max_packet_size,
            self.max_packet_size & 0x07FF
        )?;
        write!(f, "  bInterval              {:5}", self.interval)
    }
}
