//! One command, one response.
//!
//! The exchange is: discard stale input, write the command line, flush,
//! sleep through the device's processing time, then poll for a single line
//! inside a bounded window. Nothing here retries or pipelines; a second
//! command is only sent after the first exchange has returned.

use super::link::DeviceLink;
use super::protocol::{Command, Response};
use super::settings::ExchangeTiming;
use crate::error::DeviceResult;
use crate::port::{PortAdapter, PortError};
use std::time::Instant;
use tracing::{debug, warn};

/// Largest single read while draining available bytes.
const READ_CHUNK: usize = 256;

/// Runs exchanges over a borrowed, open [`DeviceLink`].
pub struct CommandChannel<'a> {
    link: &'a mut DeviceLink,
}

impl<'a> CommandChannel<'a> {
    pub fn new(link: &'a mut DeviceLink) -> Self {
        Self { link }
    }

    /// Send `command` and wait for its response.
    ///
    /// Returns [`Response::Empty`] when the device stays silent; the link is
    /// left open in that case. I/O failures close the link and come back as
    /// [`DeviceError::LinkLost`](crate::error::DeviceError::LinkLost).
    pub async fn exchange(
        &mut self,
        command: &Command,
        timing: &ExchangeTiming,
    ) -> DeviceResult<Response> {
        let started = Instant::now();
        let verb = command.verb();

        let port = self.link.port_mut()?;
        if let Err(e) = send(port, command) {
            return Err(self.link.fail(e));
        }
        debug!(%verb, "command sent");

        tokio::time::sleep(timing.response_wait).await;

        let mut pending = Vec::new();
        let polled = {
            let port = self.link.port_mut()?;
            tokio::time::timeout(timing.poll_window, async {
                loop {
                    if let Some(line) = read_line(port, &mut pending)? {
                        return Ok::<_, PortError>(line);
                    }
                    tokio::time::sleep(timing.poll_interval).await;
                }
            })
            .await
        };

        let response = match polled {
            Ok(Ok(line)) => Response::parse(&line),
            Ok(Err(e)) => return Err(self.link.fail(e)),
            // Window closed mid-line: whatever arrived is the answer.
            Err(_) => Response::parse(&String::from_utf8_lossy(&pending)),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &response {
            Response::Empty => warn!(%verb, elapsed_ms, "no response from device"),
            Response::Unrecognized(text) => {
                warn!(%verb, elapsed_ms, response = %text, "unrecognized device response")
            }
            other => debug!(%verb, elapsed_ms, response = %other, "device responded"),
        }
        Ok(response)
    }
}

// Runs on the calling task. A command line is a few dozen bytes at 115200
// baud, well under the port's write timeout, so the blocking write and flush
// stay inline instead of going through `spawn_blocking`.
fn send(port: &mut PortAdapter, command: &Command) -> Result<(), PortError> {
    port.clear_input()?;
    port.write_all_bytes(command.to_wire().as_bytes())?;
    port.flush()
}

/// Drain available bytes into `pending` and pop the first non-blank line.
///
/// Returns `Ok(None)` when no complete line is buffered yet.
fn read_line(
    port: &mut PortAdapter,
    pending: &mut Vec<u8>,
) -> Result<Option<String>, PortError> {
    loop {
        let available = match port.bytes_to_read() {
            Ok(n) => n,
            Err(e) if e.is_no_data() => 0,
            Err(e) => return Err(e),
        };
        if available == 0 {
            break;
        }
        let mut chunk = [0u8; READ_CHUNK];
        let want = available.min(READ_CHUNK);
        match port.read_bytes(&mut chunk[..want]) {
            Ok(0) => break,
            Ok(n) => pending.extend_from_slice(&chunk[..n]),
            Err(e) if e.is_no_data() => break,
            Err(e) => return Err(e),
        }
    }

    while let Some(end) = memchr::memchr(b'\n', pending) {
        let raw: Vec<u8> = pending.drain(..=end).collect();
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        if !line.is_empty() {
            return Ok(Some(line));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{LinkSettings, PortSource};
    use crate::error::DeviceError;
    use crate::port::{MockConnector, MockSerialPort};
    use crate::validation::{MinimumAge, Pin};
    use std::sync::Arc;
    use std::time::Duration;

    fn timing() -> ExchangeTiming {
        ExchangeTiming {
            response_wait: Duration::from_millis(20),
            poll_window: Duration::from_millis(80),
            poll_interval: Duration::from_millis(5),
        }
    }

    async fn open_link(port: MockSerialPort) -> DeviceLink {
        let mut link = DeviceLink::new(
            PortSource::Fixed("MOCK0".into()),
            Arc::new(MockConnector::new(port)),
            LinkSettings {
                read_timeout: Duration::from_millis(50),
                settle_delay: Duration::ZERO,
            },
        );
        link.ensure_open().await.unwrap();
        link
    }

    fn check_age() -> Command {
        Command::check_age(MinimumAge::ADULT, &Pin::parse("1234").unwrap())
    }

    #[tokio::test]
    async fn test_exchange_returns_first_line() {
        let port = MockSerialPort::new("MOCK0").with_responder(|_| Some("VERIFIED".into()));
        let mut link = open_link(port.clone()).await;

        let response = CommandChannel::new(&mut link)
            .exchange(&check_age(), &timing())
            .await
            .unwrap();
        assert_eq!(response, Response::Verified);
        assert_eq!(port.written_lines(), vec!["CHK_AGE:18,1234".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_input_is_discarded() {
        let port = MockSerialPort::new("MOCK0").with_responder(|_| Some("DENIED".into()));
        let mut link = open_link(port.clone()).await;
        port.enqueue_read(b"VERIFIED\r\n");

        let response = CommandChannel::new(&mut link)
            .exchange(&check_age(), &timing())
            .await
            .unwrap();
        assert_eq!(response, Response::Denied);
        assert_eq!(port.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_silent_device_returns_empty_within_budget() {
        let port = MockSerialPort::new("MOCK0");
        let mut link = open_link(port).await;
        let timing = timing();

        let started = Instant::now();
        let response = CommandChannel::new(&mut link)
            .exchange(&check_age(), &timing)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(response, Response::Empty);
        assert!(elapsed >= timing.response_wait);
        assert!(elapsed < timing.budget() + Duration::from_millis(200));
        assert!(link.is_open(), "a timeout must not close the link");
    }

    #[tokio::test]
    async fn test_front_loaded_wait_precedes_reading() {
        let port = MockSerialPort::new("MOCK0").with_responder(|_| Some("OK".into()));
        let mut link = open_link(port).await;
        let timing = ExchangeTiming {
            response_wait: Duration::from_millis(60),
            ..timing()
        };

        let started = Instant::now();
        CommandChannel::new(&mut link)
            .exchange(&check_age(), &timing)
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let port = MockSerialPort::new("MOCK0");
        let mut link = open_link(port.clone()).await;
        let mut pending = Vec::new();
        port.enqueue_read(b"\r\n\r\nDENIED\r\nVERIFIED\r\n");

        let adapter = link.port_mut().unwrap();
        let line = read_line(adapter, &mut pending).unwrap();
        assert_eq!(line.as_deref(), Some("DENIED"));
    }

    #[tokio::test]
    async fn test_partial_line_at_window_end_is_returned() {
        let port = MockSerialPort::new("MOCK0");
        let mut link = open_link(port.clone()).await;
        let device = port.clone();

        // The fragment lands after the input flush, while the channel is
        // still in its front-loaded wait.
        let exchange = async {
            CommandChannel::new(&mut link)
                .exchange(&check_age(), &timing())
                .await
        };
        let reply = async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            device.enqueue_read(b"ERR:BU");
        };
        let (response, ()) = tokio::join!(exchange, reply);

        assert_eq!(
            response.unwrap(),
            Response::Unrecognized("ERR:BU".to_string())
        );
    }

    #[tokio::test]
    async fn test_write_failure_closes_link() {
        let port = MockSerialPort::new("MOCK0");
        let mut link = open_link(port.clone()).await;
        port.set_fail_writes(true);

        let err = CommandChannel::new(&mut link)
            .exchange(&check_age(), &timing())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::LinkLost { .. }));
        assert!(!link.is_open());
    }

    #[tokio::test]
    async fn test_read_failure_while_polling_closes_link() {
        let port = MockSerialPort::new("MOCK0").with_responder(|_| Some("VERIFIED".into()));
        let mut link = open_link(port.clone()).await;
        port.set_fail_reads(true);

        let err = CommandChannel::new(&mut link)
            .exchange(&check_age(), &timing())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::LinkLost { ref port, .. } if port == "MOCK0"));
        assert!(!link.is_open(), "a read failure must close the link");
        assert_eq!(port.written_lines(), vec!["CHK_AGE:18,1234".to_string()]);
    }

    #[tokio::test]
    async fn test_exchange_on_closed_link_fails() {
        let port = MockSerialPort::new("MOCK0");
        let mut link = open_link(port).await;
        link.close();

        let err = CommandChannel::new(&mut link)
            .exchange(&check_age(), &timing())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::NotConnected));
    }
}
