//! Configuration schema definitions.
//!
//! Every section uses `#[serde(default)]`, so a file only needs the keys it
//! changes.

use super::error::{ConfigError, ConfigResult};
use crate::device::PortSource;
use crate::locator::{PortLocator, DEFAULT_IDENTIFIERS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub device: DeviceConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.allowed_origin_prefix.is_empty() {
            return Err(ConfigError::validation(
                "server.allowed_origin_prefix",
                "must not be empty",
            ));
        }
        if self.device.poll_window_ms == 0 {
            return Err(ConfigError::validation(
                "device.poll_window_ms",
                "must be greater than zero",
            ));
        }
        if self.device.poll_interval_ms == 0 {
            return Err(ConfigError::validation(
                "device.poll_interval_ms",
                "must be greater than zero",
            ));
        }
        if self.device.identifiers.iter().all(|id| id.trim().is_empty()) {
            return Err(ConfigError::validation(
                "device.identifiers",
                "at least one identifier is required",
            ));
        }
        Ok(())
    }
}

/// `[server]` section of the HTTP verification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port number for HTTP server
    pub port: u16,
    /// Browser origins allowed by CORS must start with this prefix
    pub allowed_origin_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origin_prefix: "chrome-extension://".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `[device]` section: where the device is and how long it takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Fixed port identifier; auto-detected when unset
    pub port: Option<String>,
    /// Read timeout set on the port handle
    pub read_timeout_ms: u64,
    /// Pause after opening while the board resets
    pub settle_ms: u64,
    /// Upper bound on polling for a reply
    pub poll_window_ms: u64,
    /// Sleep between polls
    pub poll_interval_ms: u64,
    /// Processing time allowed for `SET_ID`
    pub provision_wait_ms: u64,
    /// Processing time allowed for `CHK_AGE`
    pub verify_wait_ms: u64,
    /// Substrings that mark a port as the device during auto-detection
    pub identifiers: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: None,
            read_timeout_ms: 3000,
            settle_ms: 2000,
            poll_window_ms: 3000,
            poll_interval_ms: 100,
            provision_wait_ms: 3000,
            verify_wait_ms: 2000,
            identifiers: DEFAULT_IDENTIFIERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DeviceConfig {
    pub fn locator(&self) -> PortLocator {
        PortLocator::new(self.identifiers.iter().cloned())
    }

    /// A configured port wins; otherwise the link auto-detects on each open.
    pub fn port_source(&self) -> PortSource {
        match &self.port {
            Some(port) if !port.trim().is_empty() => PortSource::Fixed(port.trim().to_string()),
            _ => PortSource::AutoDetect(self.locator()),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    /// Multi-line, colored
    #[default]
    Pretty,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.server.allowed_origin_prefix, "chrome-extension://");
        assert_eq!(config.device.port, None);
        assert_eq!(config.device.identifiers.len(), DEFAULT_IDENTIFIERS.len());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization_keeps_defaults() {
        let toml_str = r#"
            [server]
            port = 8080

            [device]
            port = "COM5"
            verify_wait_ms = 500

            [logging]
            format = "json"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.device.port.as_deref(), Some("COM5"));
        assert_eq!(config.device.verify_wait_ms, 500);
        assert_eq!(config.device.provision_wait_ms, 3000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_port_source() {
        let mut device = DeviceConfig::default();
        assert!(matches!(device.port_source(), PortSource::AutoDetect(_)));

        device.port = Some("   ".into());
        assert!(matches!(device.port_source(), PortSource::AutoDetect(_)));

        device.port = Some(" /dev/ttyUSB0 ".into());
        assert!(matches!(device.port_source(), PortSource::Fixed(ref p) if p == "/dev/ttyUSB0"));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.device.poll_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("device.poll_interval_ms"));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[logging]"));
    }
}
