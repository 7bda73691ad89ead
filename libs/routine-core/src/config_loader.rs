//! Configuration Loader
//!
//! Sources, lowest precedence first: defaults, config files, `ROUTINE_*`
//! environment variables, then an explicit override layer (command-line flags).

use crate::config::{ConfigLayer, RoutineConfig};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_FILE_NAMES: [&str; 3] = ["routine.yaml", "routine.yml", "routine.json"];

/// Configuration loader that handles multiple sources with precedence
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_config: RoutineConfig,
    config_paths: Vec<PathBuf>,
    load_from_env: bool,
    overrides: ConfigLayer,
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_config: RoutineConfig::default(),
            config_paths: Self::get_default_config_paths(),
            load_from_env: true,
            overrides: ConfigLayer::default(),
            validate: true,
        }
    }

    /// Set the base configuration
    #[must_use]
    pub fn with_base_config(mut self, config: RoutineConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Use exactly this file instead of searching; it must exist
    #[must_use]
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_paths = vec![path.as_ref().to_path_buf()];
        self
    }

    /// Set configuration file paths
    #[must_use]
    pub fn with_config_paths<P: AsRef<Path>>(mut self, paths: Vec<P>) -> Self {
        self.config_paths = paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        self
    }

    /// Enable or disable loading from environment variables
    #[must_use]
    pub fn with_env_loading(mut self, enabled: bool) -> Self {
        self.load_from_env = enabled;
        self
    }

    /// Highest-precedence layer, usually built from command-line flags
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigLayer) -> Self {
        self.overrides = overrides;
        self
    }

    /// Enable or disable configuration validation
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Load configuration from all sources
    ///
    /// Only the first existing file is read. A file that exists but cannot be
    /// parsed is an error.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or the result is invalid
    pub fn load(&self) -> Result<RoutineConfig> {
        let mut config = self.base_config.clone();

        match self.config_paths.iter().find(|path| path.exists()) {
            Some(path) => {
                config.merge_with(&ConfigLayer::from_file(path)?);
                info!("Loaded configuration from {}", path.display());
            }
            None => debug!("No configuration file found"),
        }

        if self.load_from_env {
            config.merge_with(&ConfigLayer::from_env()?);
        }

        config.merge_with(&self.overrides);

        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Get the default configuration file paths to try
    #[must_use]
    pub fn get_default_config_paths() -> Vec<PathBuf> {
        let user_dir = Self::get_user_config_dir();
        CONFIG_FILE_NAMES
            .iter()
            .map(PathBuf::from)
            .chain(CONFIG_FILE_NAMES.iter().map(|name| user_dir.join(name)))
            .collect()
    }

    /// Get the user configuration directory
    #[must_use]
    pub fn get_user_config_dir() -> PathBuf {
        if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_home).join("routine")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".config").join("routine")
        } else if let Ok(userprofile) = std::env::var("USERPROFILE") {
            // Windows
            PathBuf::from(userprofile)
                .join("AppData")
                .join("Roaming")
                .join("routine")
        } else {
            PathBuf::from(".routine")
        }
    }

    /// Write the default configuration; the format follows the extension
    ///
    /// # Errors
    /// Returns an error if the file cannot be created
    pub fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => "json",
            _ => "yaml",
        };
        RoutineConfig::default().to_file(path, format)?;
        info!("Created sample configuration file: {}", path.display());
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_config_loader_default() {
        let loader = ConfigLoader::new();
        assert!(loader.load_from_env);
        assert!(loader.validate);
        assert_eq!(loader.config_paths.len(), 6);
    }

    #[test]
    fn test_config_file_then_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("routine.yaml");
        std::fs::write(&path, "port: 9100\nhost: 0.0.0.0\n").unwrap();

        let config = ConfigLoader::new()
            .with_config_file(&path)
            .with_env_loading(false)
            .with_overrides(ConfigLayer {
                port: Some(9200),
                ..ConfigLayer::default()
            })
            .load()
            .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9200);
    }

    #[test]
    fn test_first_existing_file_wins() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("routine.yaml");
        let json = temp_dir.path().join("routine.json");
        std::fs::write(&json, r#"{"log_level": "warn"}"#).unwrap();

        let config = ConfigLoader::new()
            .with_config_paths(vec![&missing, &json])
            .with_env_loading(false)
            .load()
            .unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("routine.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = ConfigLoader::new()
            .with_config_file(&path)
            .with_env_loading(false)
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let loader = ConfigLoader::new()
            .with_config_paths::<PathBuf>(vec![])
            .with_env_loading(false)
            .with_overrides(ConfigLayer {
                port: Some(0),
                ..ConfigLayer::default()
            });

        assert!(loader.load().is_err());
        assert_eq!(loader.with_validation(false).load().unwrap().port, 0);
    }

    #[test]
    #[serial]
    fn test_env_beats_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("routine.yaml");
        std::fs::write(&path, "log_level: warn\nport: 9100\n").unwrap();

        std::env::set_var("ROUTINE_LOG_LEVEL", "debug");
        let config = ConfigLoader::new().with_config_file(&path).load();
        std::env::remove_var("ROUTINE_LOG_LEVEL");

        let config = config.unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn test_create_sample_config() {
        let temp_dir = TempDir::new().unwrap();
        let yaml_file = temp_dir.path().join("sample.yaml");
        let json_file = temp_dir.path().join("sample.json");

        ConfigLoader::create_sample_config(&yaml_file).unwrap();
        ConfigLoader::create_sample_config(&json_file).unwrap();

        assert!(ConfigLayer::from_file(&yaml_file).is_ok());
        assert!(ConfigLayer::from_file(&json_file).is_ok());
    }

    #[test]
    fn test_get_user_config_dir() {
        let user_dir = ConfigLoader::get_user_config_dir();
        assert!(user_dir.to_string_lossy().contains("routine"));
    }
}
