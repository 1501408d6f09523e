//! Serial port discovery for the identity device.
//!
//! Each visible port is flattened into one string (device path, description,
//! hardware ID) and matched case-insensitively against known USB-to-serial
//! bridge names and the device vendor's own strings. The first match in
//! enumeration order wins. With several matching devices attached, the
//! winner depends on how the host OS orders ports.

use serialport::SerialPortType;
use tracing::{debug, warn};

/// Substrings that identify the device or its USB-serial bridge chip.
pub const DEFAULT_IDENTIFIERS: &[&str] = &[
    "CP210",
    "CH340",
    "USB-SERIAL",
    "Silicon Labs",
    "ESP32",
    "Espressif",
];

/// One port as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortListing {
    /// Path or name used to open the port (`/dev/ttyUSB0`, `COM3`).
    pub device: String,
    /// Human-readable description.
    pub description: String,
    /// Hardware ID, `USB VID:PID=XXXX:XXXX SER=...` for USB ports.
    pub hwid: String,
}

impl PortListing {
    pub fn new(
        device: impl Into<String>,
        description: impl Into<String>,
        hwid: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            description: description.into(),
            hwid: hwid.into(),
        }
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.device, self.description, self.hwid).to_uppercase()
    }
}

impl From<serialport::SerialPortInfo> for PortListing {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let (description, hwid) = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let description = match (usb.manufacturer, usb.product) {
                    (Some(m), Some(p)) => format!("{m} {p}"),
                    (Some(s), None) | (None, Some(s)) => s,
                    (None, None) => "USB serial port".to_string(),
                };
                let mut hwid = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
                if let Some(serial) = usb.serial_number {
                    hwid.push_str(&format!(" SER={serial}"));
                }
                (description, hwid)
            }
            SerialPortType::BluetoothPort => ("Bluetooth serial port".to_string(), String::new()),
            SerialPortType::PciPort => ("PCI serial port".to_string(), String::new()),
            SerialPortType::Unknown => ("n/a".to_string(), String::new()),
        };
        Self {
            device: info.port_name,
            description,
            hwid,
        }
    }
}

/// Finds the device among the host's serial ports.
#[derive(Debug, Clone)]
pub struct PortLocator {
    identifiers: Vec<String>,
}

impl Default for PortLocator {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTIFIERS.iter().copied())
    }
}

impl PortLocator {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers
                .into_iter()
                .map(|s| s.into().to_uppercase())
                .collect(),
        }
    }

    /// All ports currently visible to the host.
    ///
    /// Enumeration failures are logged and reported as an empty list.
    pub fn available() -> Vec<PortListing> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(PortListing::from).collect(),
            Err(e) => {
                warn!(error = %e, "failed to enumerate serial ports");
                Vec::new()
            }
        }
    }

    /// Enumerate the host's ports and return the first matching device path.
    pub fn locate(&self) -> Option<String> {
        self.locate_in(&Self::available())
    }

    /// Return the device path of the first listing that matches.
    pub fn locate_in(&self, listings: &[PortListing]) -> Option<String> {
        let found = listings
            .iter()
            .find(|listing| self.matches(listing))
            .map(|listing| listing.device.clone());
        match &found {
            Some(device) => debug!(port = %device, "device port located"),
            None => debug!(candidates = listings.len(), "no matching device port"),
        }
        found
    }

    pub fn matches(&self, listing: &PortListing) -> bool {
        let text = listing.search_text();
        self.identifiers.iter().any(|id| text.contains(id.as_str()))
    }
}
