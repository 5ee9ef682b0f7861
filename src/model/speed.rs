//! USB link speed as reported by the host.

use std::fmt;

/// USB speed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsbSpeed {
    /// USB 1.0 Low Speed - 1.5 Mbps
    Low,
    /// USB 1.1 Full Speed - 12 Mbps
    Full,
    /// USB 2.0 High Speed - 480 Mbps
    High,
    /// USB 3.0/3.1 Gen 1 SuperSpeed - 5 Gbps
    Super,
    /// USB 3.1 Gen 2 SuperSpeed+ - 10 Gbps
    SuperPlus,
    /// USB 3.2 Gen 2x2 SuperSpeed+ - 20 Gbps
    SuperPlus2,
}

impl UsbSpeed {
    /// Parse from the sysfs 'speed' attribute (value in Mbps, e.g. "1.5", "480").
    pub fn from_sysfs(s: &str) -> Option<Self> {
        match s.trim() {
            "1.5" | "1" | "2" => Some(Self::Low),
            "12" => Some(Self::Full),
            "480" => Some(Self::High),
            "5000" => Some(Self::Super),
            "10000" => Some(Self::SuperPlus),
            "20000" => Some(Self::SuperPlus2),
            _ => None,
        }
    }
}

impl fmt::Display for UsbSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "Low Speed (1.5 Mbps)",
            Self::Full => "Full Speed (12 Mbps)",
            Self::High => "High Speed (480 Mbps)",
            Self::Super => "SuperSpeed (5 Gbps)",
            Self::SuperPlus => "SuperSpeed+ (10 Gbps)",
            Self::SuperPlus2 => "SuperSpeed+ 2x2 (20 Gbps)",
        };
        write!(f, "{}", name)
    }
}
