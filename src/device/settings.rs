//! Timing knobs for the link and for individual exchanges.

use crate::config::DeviceConfig;
use std::time::Duration;

/// How the link opens the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Read timeout configured on the port handle.
    pub read_timeout: Duration,
    /// Pause after opening while the board boots.
    pub settle_delay: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(3000),
            settle_delay: Duration::from_millis(2000),
        }
    }
}

impl From<&DeviceConfig> for LinkSettings {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            settle_delay: Duration::from_millis(config.settle_ms),
        }
    }
}

/// Two-phase wait of one exchange.
///
/// After the command is written the channel sleeps for `response_wait`
/// (the firmware's processing time), then polls every `poll_interval` for
/// at most `poll_window`. An exchange therefore returns no later than
/// `response_wait + poll_window` after the write, plus one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeTiming {
    pub response_wait: Duration,
    pub poll_window: Duration,
    pub poll_interval: Duration,
}

impl ExchangeTiming {
    pub const DEFAULT_POLL_WINDOW: Duration = Duration::from_millis(3000);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// `SET_ID` writes to flash and needs the longer wait.
    pub fn provisioning() -> Self {
        Self::with_wait(Duration::from_millis(3000))
    }

    pub fn verification() -> Self {
        Self::with_wait(Duration::from_millis(2000))
    }

    pub fn with_wait(response_wait: Duration) -> Self {
        Self {
            response_wait,
            poll_window: Self::DEFAULT_POLL_WINDOW,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Upper bound on the time an unanswered exchange takes.
    pub fn budget(&self) -> Duration {
        self.response_wait + self.poll_window
    }
}

/// Per-call-site timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeTimings {
    pub provisioning: ExchangeTiming,
    pub verification: ExchangeTiming,
}

impl Default for ExchangeTimings {
    fn default() -> Self {
        Self {
            provisioning: ExchangeTiming::provisioning(),
            verification: ExchangeTiming::verification(),
        }
    }
}

impl From<&DeviceConfig> for ExchangeTimings {
    fn from(config: &DeviceConfig) -> Self {
        let poll_window = Duration::from_millis(config.poll_window_ms);
        let poll_interval = Duration::from_millis(config.poll_interval_ms);
        let timing = |wait_ms: u64| ExchangeTiming {
            response_wait: Duration::from_millis(wait_ms),
            poll_window,
            poll_interval,
        };
        Self {
            provisioning: timing(config.provision_wait_ms),
            verification: timing(config.verify_wait_ms),
        }
    }
}
