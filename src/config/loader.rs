//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "ZKPASS";

/// Config file name
const CONFIG_FILE_NAME: &str = "zkpass.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "ZKPASS_CONFIG";

/// Device port variable understood by earlier deployments.
const LEGACY_PORT_ENV: &str = "ESP32_PORT";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using the standard resolution order, then apply
    /// environment overrides and validate.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Explicit path if given, standard resolution otherwise.
    pub fn load_with(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Platform config file location, whether or not it exists.
pub fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "zkpass-bridge").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn env_var(key: &str) -> Option<(String, String)> {
    let var = format!("{ENV_PREFIX}_{key}");
    std::env::var(&var).ok().map(|val| (var, val))
}

fn parse_env<T: FromStr>(var: &str, val: &str, what: &str) -> ConfigResult<T> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}")))
}

/// Apply `ZKPASS_<SECTION>_<KEY>` overrides to the configuration.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Server
    if let Some((_, val)) = env_var("SERVER_HOST") {
        config.server.host = val;
    }
    if let Some((var, val)) = env_var("SERVER_PORT") {
        config.server.port = parse_env(&var, &val, "port number")?;
    }
    if let Some((_, val)) = env_var("SERVER_ALLOWED_ORIGIN_PREFIX") {
        config.server.allowed_origin_prefix = val;
    }

    // Device
    if let Some(val) = env_var("DEVICE_PORT")
        .map(|(_, val)| val)
        .or_else(|| std::env::var(LEGACY_PORT_ENV).ok())
    {
        config.device.port = Some(val).filter(|p| !p.trim().is_empty());
    }
    let durations = [
        ("DEVICE_READ_TIMEOUT_MS", &mut config.device.read_timeout_ms),
        ("DEVICE_SETTLE_MS", &mut config.device.settle_ms),
        ("DEVICE_POLL_WINDOW_MS", &mut config.device.poll_window_ms),
        ("DEVICE_POLL_INTERVAL_MS", &mut config.device.poll_interval_ms),
        ("DEVICE_PROVISION_WAIT_MS", &mut config.device.provision_wait_ms),
        ("DEVICE_VERIFY_WAIT_MS", &mut config.device.verify_wait_ms),
    ];
    for (key, slot) in durations {
        if let Some((var, val)) = env_var(key) {
            *slot = parse_env(&var, &val, "duration in milliseconds")?;
        }
    }
    if let Some((_, val)) = env_var("DEVICE_IDENTIFIERS") {
        config.device.identifiers = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    // Logging
    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((var, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = val
            .parse()
            .map_err(|message: String| ConfigError::env_parse(var, message))?;
    }

    Ok(())
}
