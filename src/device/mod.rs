//! Device communication layer.
//!
//! ```text
//! caller ──> AccessSerializer ──> DeviceLink (ensure_open) ──> CommandChannel
//!                 (one at a time)      (PortLocator / fixed port)   (write, wait, poll)
//! ```

pub mod channel;
pub mod link;
pub mod protocol;
pub mod serializer;
pub mod settings;

pub use channel::CommandChannel;
pub use link::{DeviceLink, PortSource};
pub use protocol::{Command, Response, Verb};
pub use serializer::{AccessSerializer, ExclusiveAccess};
pub use settings::{ExchangeTiming, ExchangeTimings, LinkSettings};
