//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates the identity device without
//! requiring actual hardware. A responder function plays the firmware's part:
//! every complete command line written to the port is handed to it, and any
//! reply it returns is queued for the next read.

use super::error::PortError;
use super::traits::{Connector, PortAdapter, PortConfiguration, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Maps a command line (without its terminator) to an optional reply line.
pub type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Direction of a recorded port operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEventKind {
    /// A complete command line was written.
    Write,
    /// A read returned at least one byte.
    Read,
}

/// One recorded port operation with its timestamp.
#[derive(Debug, Clone, Copy)]
pub struct MockEvent {
    pub kind: MockEventKind,
    pub at: Instant,
}

/// Inner state of the mock port, protected by a mutex for interior mutability.
#[derive(Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all raw writes.
    write_log: Vec<Vec<u8>>,
    /// Bytes written since the last newline.
    partial_line: Vec<u8>,
    /// Complete command lines, terminators stripped.
    lines: Vec<String>,
    /// Ordered write/read activity.
    events: Vec<MockEvent>,
    responder: Option<Responder>,
    /// Whether writes should fail as if the device was unplugged.
    fail_writes: bool,
    /// Whether reads and buffer queries should fail the same way.
    fail_reads: bool,
    /// Whether the next read should time out.
    should_timeout: bool,
    /// Number of times the input buffer was cleared.
    clear_count: usize,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the device link owns another.
///
/// # Example
/// ```
/// use zkpass_bridge::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0")
///     .with_responder(|line| line.starts_with("CHK_AGE").then(|| "VERIFIED".to_string()));
///
/// port.write_bytes(b"CHK_AGE:18,1234\n").unwrap();
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"VERIFIED\r\n");
/// assert_eq!(port.written_lines(), vec!["CHK_AGE:18,1234".to_string()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, shared between clones.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Install the firmware stand-in that answers command lines.
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.state.lock().responder = Some(Arc::new(responder));
        self
    }

    /// A handle sharing this port's state under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::clone(&self.state),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Get a copy of all raw data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Complete command lines written so far, without terminators.
    pub fn written_lines(&self) -> Vec<String> {
        self.state.lock().lines.clone()
    }

    /// Ordered log of writes and non-empty reads.
    pub fn events(&self) -> Vec<MockEvent> {
        self.state.lock().events.clone()
    }

    /// Make every subsequent write fail with a broken-pipe error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Make every subsequent read and `bytes_to_read` fail with a
    /// broken-pipe error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Set whether the next read operation should time out.
    pub fn set_should_timeout(&self, should_timeout: bool) {
        self.state.lock().should_timeout = should_timeout;
    }

    /// Number of times the receive buffer was discarded.
    pub fn clear_count(&self) -> usize {
        self.state.lock().clear_count
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if state.fail_writes {
            return Err(disconnected());
        }

        state.write_log.push(data.to_vec());

        for &byte in data {
            if byte != b'\n' {
                state.partial_line.push(byte);
                continue;
            }
            let raw = std::mem::take(&mut state.partial_line);
            let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
            state.events.push(MockEvent {
                kind: MockEventKind::Write,
                at: Instant::now(),
            });
            let reply = state.responder.as_ref().and_then(|respond| respond(&line));
            if let Some(reply) = reply {
                state.read_queue.extend(reply.as_bytes());
                state.read_queue.extend(b"\r\n");
            }
            state.lines.push(line);
        }

        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if state.fail_reads {
            return Err(disconnected());
        }

        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(super::traits::DEFAULT_READ_TIMEOUT));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            // Simulate "would block" behavior by returning an I/O error
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )));
        }

        state.events.push(MockEvent {
            kind: MockEventKind::Read,
            at: Instant::now(),
        });
        Ok(bytes_read)
    }

    fn flush(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.clear_count += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(disconnected());
        }
        Ok(state.read_queue.len())
    }
}

fn disconnected() -> PortError {
    PortError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "mock device disconnected",
    ))
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// Connector that hands out handles to a shared [`MockSerialPort`].
#[derive(Debug, Clone)]
pub struct MockConnector {
    port: MockSerialPort,
    fail: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new(port: MockSerialPort) -> Self {
        Self {
            port,
            fail: Arc::new(AtomicBool::new(false)),
            attempts: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make subsequent connects fail as if the port did not exist.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of connect attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Port names that were opened successfully, in order.
    pub fn opened_ports(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    /// The shared mock port.
    pub fn port(&self) -> &MockSerialPort {
        &self.port
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        port_name: &str,
        _config: &PortConfiguration,
    ) -> Result<PortAdapter, PortError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::not_found(port_name));
        }
        self.opened.lock().push(port_name.to_string());
        Ok(Box::new(self.port.renamed(port_name)))
    }
}
