// src/config/loader.rs
//! Layered configuration loader
//!
//! Sources, lowest precedence first: built-in defaults, each configured TOML
//! file that exists, then `EMG_ACQUIRE_<SECTION>__<KEY>` environment variables
//! (for example `EMG_ACQUIRE_SERIAL__PORT_NAME=/dev/ttyACM0`).

use crate::config::{constants::paths, AcquisitionConfig, ConfigError};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    use_environment: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading `emg-acquire.toml` from the working directory plus the environment
    pub fn new() -> Self {
        Self {
            config_paths: vec![PathBuf::from(paths::DEFAULT_CONFIG_FILE)],
            use_environment: true,
        }
    }

    /// Loader with custom file paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            use_environment: true,
        }
    }

    /// Skip environment overrides
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    /// Merge every source, deserialize and validate
    pub fn load(&self) -> Result<AcquisitionConfig, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AcquisitionConfig::default())?);

        for path in &self.config_paths {
            if path.exists() {
                debug!(path = %path.display(), "Merging configuration file");
                builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
            }
        }

        if self.use_environment {
            builder = builder.add_source(
                Environment::with_prefix(paths::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(paths::ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let config: AcquisitionConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            port = %config.serial.port_name,
            baud = config.serial.baud_rate,
            sample_rate_hz = config.stream.sample_rate_hz,
            chunk_size = config.stream.chunk_size,
            samples_per_update = config.stream.samples_per_update,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a single file strictly: it must exist
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<AcquisitionConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Parse and validate TOML text
    pub fn load_str(content: &str) -> Result<AcquisitionConfig, ConfigError> {
        let config: AcquisitionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write `config` as pretty TOML
    pub fn export_config<P: AsRef<Path>>(config: &AcquisitionConfig, path: P) -> Result<(), ConfigError> {
        let toml_content = toml::to_string_pretty(config)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }
}
