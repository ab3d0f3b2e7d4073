//! Configuration management for ttlkv
//!
//! Configuration is an explicit [`Config`] value handed to constructors.
//! Loading it from a TOML file and from `TTLKV_*` environment variables
//! happens here and in the CLI, never inside the client itself.

use crate::error::{Result, TtlKvError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "TTLKV_CONFIG";

/// File picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "ttlkv.toml";

/// Environment variable overriding `logging.level`
pub const LOG_LEVEL_ENV: &str = "TTLKV_LOG_LEVEL";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

/// Where the backing store lives and how to authenticate against it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub db: u32,
}

/// Transport settings, timeouts in seconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub tcp_nodelay: bool,
    pub connect_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub file_path: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
            db: 0,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            connect_timeout: 5,
            read_timeout: 30,
            write_timeout: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file_path: None,
        }
    }
}

impl StoreConfig {
    /// `host:port` as used for connecting and in error messages
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }
}

impl std::str::FromStr for LogFormat {
    type Err = TtlKvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(TtlKvError::config(
                format!("Invalid log format: {s}"),
                "logging.format",
            )),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the config file if one is found,
    /// then `TTLKV_*` environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let config = Self::load_layers(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Same layering as [`Config::load`] without the final validation, so
    /// callers with further overrides can validate the merged result once.
    /// An explicit `path` takes the place of `TTLKV_CONFIG`.
    pub fn load_layers(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));
        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Read a TOML configuration file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| TtlKvError::Config {
            message: format!("Failed to read config file {}: {e}", path.display()),
            field: None,
        })?;

        toml::from_str(&contents).map_err(|e| TtlKvError::Config {
            message: format!("Failed to parse config file {}: {e}", path.display()),
            field: None,
        })
    }

    /// Apply `TTLKV_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = env::var("TTLKV_HOST") {
            self.store.host = host;
        }
        if let Some(port) = parse_env::<u16>("TTLKV_PORT", "store.port")? {
            self.store.port = port;
        }
        if let Ok(username) = env::var("TTLKV_USERNAME") {
            self.store.username = Some(username);
        }
        if let Ok(password) = env::var("TTLKV_PASSWORD") {
            self.store.password = Some(password);
        }
        if let Some(db) = parse_env::<u32>("TTLKV_DB", "store.db")? {
            self.store.db = db;
        }
        if let Some(t) = parse_env::<u64>("TTLKV_CONNECT_TIMEOUT", "network.connect_timeout")? {
            self.network.connect_timeout = t;
        }
        if let Some(t) = parse_env::<u64>("TTLKV_READ_TIMEOUT", "network.read_timeout")? {
            self.network.read_timeout = t;
        }
        if let Some(t) = parse_env::<u64>("TTLKV_WRITE_TIMEOUT", "network.write_timeout")? {
            self.network.write_timeout = t;
        }
        if let Ok(level) = env::var(LOG_LEVEL_ENV) {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("TTLKV_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.store.host.trim().is_empty() {
            return Err(TtlKvError::config("Host must not be empty", "store.host"));
        }
        if self.store.port == 0 {
            return Err(TtlKvError::config("Port must be non-zero", "store.port"));
        }
        if self.store.username.is_some() && self.store.password.is_none() {
            return Err(TtlKvError::config(
                "A username requires a password",
                "store.password",
            ));
        }
        for (value, field) in [
            (self.network.connect_timeout, "network.connect_timeout"),
            (self.network.read_timeout, "network.read_timeout"),
            (self.network.write_timeout, "network.write_timeout"),
        ] {
            if value == 0 {
                return Err(TtlKvError::config("Timeout must be greater than 0", field));
            }
        }
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(TtlKvError::config(
                format!("Invalid log level: {other}"),
                "logging.level",
            )),
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, field: &str) -> Result<Option<T>> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| TtlKvError::config(format!("Invalid value for {var}: {raw}"), field)),
        Err(_) => Ok(None),
    }
}
