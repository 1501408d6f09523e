//! Configuration for the bridge binaries.
//!
//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `ZKPASS_CONFIG` environment variable (explicit path)
//! 2. `./zkpass.toml` (current directory)
//! 3. `zkpass.toml` in the platform config directory
//!    (`~/.config/zkpass-bridge/` on Linux, `%APPDATA%\zkpass-bridge\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `ZKPASS_<SECTION>_<KEY>`:
//! - `ZKPASS_SERVER_PORT=8080`
//! - `ZKPASS_DEVICE_PORT=/dev/ttyUSB0`
//! - `ZKPASS_LOGGING_FORMAT=json`
//!
//! `ESP32_PORT` is honoured for the device port when `ZKPASS_DEVICE_PORT`
//! is unset.
//!
//! # Example
//!
//! ```rust,no_run
//! use zkpass_bridge::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! println!("listening on {}", loader.config().server.bind_address());
//! # Ok::<(), zkpass_bridge::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{Config, DeviceConfig, LogFormat, LoggingConfig, ServerConfig};
