//! Shared test utilities for the bridge's integration tests.
//!
//! - A scripted stand-in for the device firmware
//! - A mock device wired into a ready-to-use `DeviceService`
//! - Short timings so exchanges finish in milliseconds

#![allow(dead_code)]

use chrono::Datelike;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use zkpass_bridge::device::{
    DeviceLink, ExchangeTiming, ExchangeTimings, LinkSettings, PortSource,
};
use zkpass_bridge::port::{MockConnector, MockSerialPort};
use zkpass_bridge::service::DeviceService;

pub const MOCK_PORT: &str = "/dev/ttyMOCK0";

pub fn fast_timing() -> ExchangeTiming {
    ExchangeTiming {
        response_wait: Duration::from_millis(5),
        poll_window: Duration::from_millis(60),
        poll_interval: Duration::from_millis(2),
    }
}

pub fn fast_timings() -> ExchangeTimings {
    ExchangeTimings {
        provisioning: fast_timing(),
        verification: fast_timing(),
    }
}

pub fn fast_settings() -> LinkSettings {
    LinkSettings {
        read_timeout: Duration::from_millis(20),
        settle_delay: Duration::ZERO,
    }
}

/// Minimal firmware model: `SET_ID` stores birth year and PIN, `CHK_AGE`
/// compares against them. Anything else gets `ERR:UNKNOWN`.
pub fn firmware() -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
    let stored: Arc<Mutex<Option<(i32, String)>>> = Arc::new(Mutex::new(None));
    move |line: &str| {
        let (verb, args) = line.split_once(':')?;
        let args: Vec<&str> = args.split(',').collect();
        match (verb, args.as_slice()) {
            ("SET_ID", [_, _, dob, _, _, pin]) => {
                let year = dob.get(..4)?.parse().ok()?;
                *stored.lock() = Some((year, pin.to_string()));
                Some("OK".into())
            }
            ("CHK_AGE", [min_age, pin]) => {
                let min_age: i32 = min_age.parse().ok()?;
                let answer = match &*stored.lock() {
                    Some((year, stored_pin)) if stored_pin == pin => {
                        let age = chrono::Local::now().year() - year;
                        if age >= min_age {
                            "VERIFIED"
                        } else {
                            "DENIED"
                        }
                    }
                    _ => "DENIED",
                };
                Some(answer.into())
            }
            _ => Some("ERR:UNKNOWN".into()),
        }
    }
}

/// A mock device plus the handles a test needs to inspect it.
pub struct MockDevice {
    pub port: MockSerialPort,
    pub connector: MockConnector,
}

impl MockDevice {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self::from_port(MockSerialPort::new(MOCK_PORT).with_responder(responder))
    }

    /// A device that never answers.
    pub fn silent() -> Self {
        Self::from_port(MockSerialPort::new(MOCK_PORT))
    }

    /// Answers every command with the same line.
    pub fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Some(reply.clone()))
    }

    fn from_port(port: MockSerialPort) -> Self {
        let connector = MockConnector::new(port.clone());
        Self { port, connector }
    }

    pub fn link(&self) -> DeviceLink {
        DeviceLink::new(
            PortSource::Fixed(MOCK_PORT.to_string()),
            Arc::new(self.connector.clone()),
            fast_settings(),
        )
    }

    pub fn service(&self) -> DeviceService {
        DeviceService::new(self.link(), fast_timings())
    }
}
