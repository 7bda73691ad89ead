//! Runtime configuration
//!
//! [`RoutineConfig`] is the resolved configuration. Each source (file,
//! environment, command line) produces a [`ConfigLayer`] whose set fields
//! override what is already there; see [`crate::config_loader::ConfigLoader`].

use crate::error::{Result, RoutineError};
use routine_common::{DEFAULT_DATABASE_URL, DEFAULT_SERVER_PORT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutineConfig {
    /// SQLite connection string
    pub database_url: String,
    /// HTTP bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Default `tracing` filter; `RUST_LOG` wins when set
    pub log_level: String,
    /// Emit JSON log lines
    pub json_logs: bool,
    /// Also write logs to this file, rotated daily
    pub log_file: Option<PathBuf>,
    /// Run a sweep over all users this often while serving
    pub sweep_interval_secs: Option<u64>,
    /// Sync completed tasks to the users' Google calendars
    pub calendar_enabled: bool,
}

impl Default for RoutineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_SERVER_PORT,
            log_level: "info".to_string(),
            json_logs: false,
            log_file: None,
            sweep_interval_secs: None,
            calendar_enabled: false,
        }
    }
}

impl RoutineConfig {
    /// Overlay the fields set in `layer`
    pub fn merge_with(&mut self, layer: &ConfigLayer) {
        if let Some(database_url) = &layer.database_url {
            self.database_url.clone_from(database_url);
        }
        if let Some(host) = &layer.host {
            self.host.clone_from(host);
        }
        if let Some(port) = layer.port {
            self.port = port;
        }
        if let Some(log_level) = &layer.log_level {
            self.log_level = log_level.to_lowercase();
        }
        if let Some(json_logs) = layer.json_logs {
            self.json_logs = json_logs;
        }
        if layer.log_file.is_some() {
            self.log_file.clone_from(&layer.log_file);
        }
        if layer.sweep_interval_secs.is_some() {
            self.sweep_interval_secs = layer.sweep_interval_secs;
        }
        if let Some(calendar_enabled) = layer.calendar_enabled {
            self.calendar_enabled = calendar_enabled;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(RoutineError::configuration("Database URL cannot be empty"));
        }
        if self.port == 0 {
            return Err(RoutineError::configuration("Port must be greater than 0"));
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(RoutineError::configuration(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        if self.sweep_interval_secs == Some(0) {
            return Err(RoutineError::configuration(
                "Sweep interval must be greater than 0 seconds",
            ));
        }
        Ok(())
    }

    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    /// Returns an error for an unsupported format or if the file cannot be written
    pub fn to_file<P: AsRef<Path>>(&self, path: P, format: &str) -> Result<()> {
        let path = path.as_ref();
        let content = match format {
            "yaml" | "yml" => serde_yaml::to_string(self)?,
            "json" => serde_json::to_string_pretty(self)?,
            _ => {
                return Err(RoutineError::configuration(format!(
                    "Unsupported format: {format}"
                )))
            }
        };

        std::fs::write(path, content).map_err(|e| {
            RoutineError::Io(std::io::Error::other(format!(
                "Failed to write config file {}: {e}",
                path.display()
            )))
        })
    }
}

/// One configuration source; `None` leaves the lower layer's value in place
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub database_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
    pub log_file: Option<PathBuf>,
    pub sweep_interval_secs: Option<u64>,
    pub calendar_enabled: Option<bool>,
}

impl ConfigLayer {
    /// Read a YAML (`.yaml`/`.yml`) or JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RoutineError::Io(std::io::Error::other(format!(
                "Failed to read config file {}: {e}",
                path.display()
            )))
        })?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|e| {
                RoutineError::configuration(format!("Failed to parse YAML config: {e}"))
            }),
            _ => serde_json::from_str(&content).map_err(|e| {
                RoutineError::configuration(format!("Failed to parse JSON config: {e}"))
            }),
        }
    }

    /// Read `ROUTINE_*` environment variables
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparseable value
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a layer from any key lookup
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layer = Self {
            database_url: lookup("ROUTINE_DATABASE_URL"),
            host: lookup("ROUTINE_HOST"),
            log_level: lookup("ROUTINE_LOG_LEVEL"),
            log_file: lookup("ROUTINE_LOG_FILE").map(PathBuf::from),
            ..Self::default()
        };

        if let Some(port) = lookup("ROUTINE_PORT") {
            layer.port = Some(
                port.parse()
                    .map_err(|_| RoutineError::configuration("Invalid ROUTINE_PORT value"))?,
            );
        }
        if let Some(interval) = lookup("ROUTINE_SWEEP_INTERVAL_SECS") {
            layer.sweep_interval_secs = Some(interval.parse().map_err(|_| {
                RoutineError::configuration("Invalid ROUTINE_SWEEP_INTERVAL_SECS value")
            })?);
        }
        if let Some(json_logs) = lookup("ROUTINE_JSON_LOGS") {
            layer.json_logs = Some(parse_bool(&json_logs));
        }
        if let Some(enabled) = lookup("ROUTINE_CALENDAR_ENABLED") {
            layer.calendar_enabled = Some(parse_bool(&enabled));
        }

        Ok(layer)
    }
}

/// Parse a boolean value from a string
fn parse_bool(value: &str) -> bool {
    let lower = value.to_lowercase();
    matches!(lower.as_str(), "true" | "1" | "yes" | "on")
}
