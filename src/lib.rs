//! ZK-Pass serial bridge.
//!
//! Talks to a ZK-Pass identity device over a serial link: provisioning a
//! citizen identity onto it (`SET_ID`) and asking it whether a PIN holder
//! meets a minimum age (`CHK_AGE`). One device, one exchange at a time.
//!
//! # Modules
//!
//! - `port`: serial port abstraction (real hardware and an in-process mock)
//! - `locator`: finds the device among the host's serial ports
//! - `device`: link lifecycle, the command/response channel and access serialization
//! - `service`: provisioning and verification workflows
//! - `validation`: checks on every field before it reaches the device
//! - `config`: TOML configuration with environment overrides
//! - `logging`: `tracing` subscriber setup
//! - `console`: prompts for the provisioning CLI
//! - `rest_api`: the HTTP endpoint (when `rest-api` feature is enabled)

pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod locator;
pub mod logging;
pub mod port;
pub mod service;
pub mod validation;

#[cfg(feature = "rest-api")]
pub mod rest_api;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use device::{AccessSerializer, Command, CommandChannel, DeviceLink, PortSource, Response};
pub use error::{ApiError, DeviceError, DeviceResult};
pub use locator::{PortListing, PortLocator};
pub use port::{MockConnector, MockSerialPort, PortError, SerialConnector, SerialPortAdapter};
pub use service::{
    DeviceService, ProvisionOutcome, ProvisioningWorkflow, SelfTest, VerificationOutcome,
    VerificationRequestHandler,
};
pub use validation::{CitizenIdentity, MinimumAge, Pin, ValidationError};
