//! Port abstraction layer for serial communication.
//!
//! Provides the adapter and connector traits plus a hardware implementation
//! and a scripted mock, enabling dependency injection and testing.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockConnector, MockEvent, MockEventKind, MockSerialPort};
pub use sync_port::*;
pub use traits::*;
