//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait that allows both real serial ports
//! and mock implementations to be used interchangeably, and the `Connector`
//! trait that opens them.

use super::error::PortError;
use std::time::Duration;

/// Baud rate spoken by the identity device firmware.
pub const DEVICE_BAUD_RATE: u32 = 115_200;

/// Default read timeout applied to a freshly opened port.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration parameters for a serial port.
///
/// Framing is always 8N1 without flow control, which is what the device
/// firmware expects and what `serialport` uses by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Read/write timeout.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: DEVICE_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Trait for serial port I/O operations.
///
/// This trait abstracts over synchronous serial port operations, allowing both
/// real hardware ports and mock implementations for testing.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Flush the transmit buffer to the wire.
    fn flush(&mut self) -> Result<(), PortError>;

    /// Discard any unread data in the receive buffer.
    fn clear_input(&mut self) -> Result<(), PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Number of bytes waiting in the receive buffer.
    ///
    /// A driver failure here is a link failure, not an empty buffer.
    fn bytes_to_read(&self) -> Result<usize, PortError>;

    /// Write the whole buffer, retrying short writes.
    fn write_all_bytes(&mut self, mut data: &[u8]) -> Result<(), PortError> {
        while !data.is_empty() {
            let n = self.write_bytes(data)?;
            if n == 0 {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "serial port accepted no bytes",
                )));
            }
            data = &data[n..];
        }
        Ok(())
    }
}

/// Boxed adapter handed out by a [`Connector`].
pub type PortAdapter = Box<dyn SerialPortAdapter>;

/// Opens serial ports by name.
///
/// The device link owns a connector instead of calling `serialport` directly,
/// so tests can substitute a scripted device.
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Open `port_name` with the given configuration.
    fn connect(&self, port_name: &str, config: &PortConfiguration)
        -> Result<PortAdapter, PortError>;
}
