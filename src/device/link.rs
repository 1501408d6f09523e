//! The single connection to the identity device.
//!
//! A `DeviceLink` owns the open port handle and knows how to (re)open it.
//! It is created once per process and handed to the
//! [`AccessSerializer`](super::AccessSerializer), which is the only place it
//! is mutated once concurrent callers exist.

use super::settings::LinkSettings;
use crate::error::{DeviceError, DeviceResult};
use crate::locator::PortLocator;
use crate::port::{Connector, PortAdapter, PortConfiguration, PortError, DEVICE_BAUD_RATE};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the port identifier comes from.
#[derive(Debug, Clone)]
pub enum PortSource {
    /// Supplied by the operator (flag, config file or environment).
    Fixed(String),
    /// Found by scanning the host's ports on every (re)open.
    AutoDetect(PortLocator),
}

/// Connection state.
#[derive(Debug, Default)]
enum LinkState {
    #[default]
    Closed,
    Open {
        port: PortAdapter,
        port_name: String,
        opened_at: Instant,
    },
}

/// Owns the serial connection and its open/close lifecycle.
#[derive(Debug)]
pub struct DeviceLink {
    source: PortSource,
    connector: Arc<dyn Connector>,
    settings: LinkSettings,
    state: LinkState,
    /// Last port that opened successfully, reused if auto-detection comes up empty.
    last_port: Option<String>,
}

impl DeviceLink {
    pub fn new(source: PortSource, connector: Arc<dyn Connector>, settings: LinkSettings) -> Self {
        Self {
            source,
            connector,
            settings,
            state: LinkState::Closed,
            last_port: None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, LinkState::Open { .. })
    }

    /// Name of the open port, if any.
    pub fn port_name(&self) -> Option<&str> {
        match &self.state {
            LinkState::Open { port_name, .. } => Some(port_name),
            LinkState::Closed => None,
        }
    }

    /// Open `port_name`, then wait for the device to finish its reset.
    ///
    /// Opening a USB serial port toggles DTR on most bridges, which reboots
    /// the board; commands sent before the settle delay are lost. Any
    /// previously open handle is released first.
    pub async fn open(&mut self, port_name: &str) -> DeviceResult<()> {
        self.close();

        let config = PortConfiguration {
            baud_rate: DEVICE_BAUD_RATE,
            timeout: self.settings.read_timeout,
        };
        let port = self
            .connector
            .connect(port_name, &config)
            .map_err(|source| {
                warn!(port = %port_name, error = %source, "failed to open device port");
                DeviceError::Connection {
                    port: port_name.to_string(),
                    source,
                }
            })?;

        tokio::time::sleep(self.settings.settle_delay).await;

        info!(port = %port_name, baud = DEVICE_BAUD_RATE, "device link open");
        self.last_port = Some(port_name.to_string());
        self.state = LinkState::Open {
            port,
            port_name: port_name.to_string(),
            opened_at: Instant::now(),
        };
        Ok(())
    }

    /// Open the link unless it already is.
    pub async fn ensure_open(&mut self) -> DeviceResult<()> {
        if self.is_open() {
            return Ok(());
        }
        let port_name = self.resolve_port()?;
        self.open(&port_name).await
    }

    /// Release the port. Safe to call on a closed or never-opened link.
    pub fn close(&mut self) {
        if let LinkState::Open {
            port_name,
            opened_at,
            ..
        } = std::mem::take(&mut self.state)
        {
            info!(
                port = %port_name,
                open_for_ms = opened_at.elapsed().as_millis() as u64,
                "device link closed"
            );
        }
    }

    /// Close after an I/O failure and build the matching error. The next
    /// `ensure_open` reconnects.
    pub(crate) fn fail(&mut self, source: PortError) -> DeviceError {
        let port = self.port_name().unwrap_or_default().to_string();
        warn!(port = %port, error = %source, "device link lost");
        self.close();
        DeviceError::LinkLost { port, source }
    }

    /// Mutable access to the open port.
    pub(crate) fn port_mut(&mut self) -> DeviceResult<&mut PortAdapter> {
        match &mut self.state {
            LinkState::Open { port, .. } => Ok(port),
            LinkState::Closed => Err(DeviceError::NotConnected),
        }
    }

    /// The port the next open would use: the fixed one, a freshly located
    /// one, or the last port that worked.
    pub fn resolve_port(&self) -> DeviceResult<String> {
        match &self.source {
            PortSource::Fixed(port) => Ok(port.clone()),
            PortSource::AutoDetect(locator) => {
                if let Some(port) = locator.locate() {
                    return Ok(port);
                }
                match &self.last_port {
                    Some(port) => {
                        debug!(port = %port, "auto-detect found nothing, reusing last port");
                        Ok(port.clone())
                    }
                    None => Err(DeviceError::NoPort),
                }
            }
        }
    }
}
