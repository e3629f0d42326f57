// src/config/mod.rs
//! Configuration snapshot consumed by the acquisition core
//!
//! The presentation layer owns the widgets; the core only ever sees an
//! [`AcquisitionConfig`] (or, per cycle, a [`FilterConfig`]) built from them.

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::ConfigLoader;

use crate::hal::serial_driver::SerialConfig;
use crate::recording::OverflowPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Configuration validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Recording target error: {0}")]
    RecordingTarget(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Complete configuration snapshot
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct AcquisitionConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

/// Sample stream geometry
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StreamConfig {
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// Values emitted per cycle
    #[serde(default = "defaults::samples_per_update")]
    pub samples_per_update: usize,

    /// Window length filtered per cycle; the part older than
    /// `samples_per_update` only settles the filters.
    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: usize,
}

/// Per-cycle filter snapshot
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilterConfig {
    /// Subtract the window mean before spectral shaping
    #[serde(default)]
    pub center: bool,
    #[serde(default)]
    pub notch: NotchConfig,
    #[serde(default)]
    pub bandpass: BandpassConfig,
}

/// Mains-hum notch stage
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NotchConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Fundamental frequency in Hz
    #[serde(default = "defaults::notch_f0")]
    pub f0: f64,
    /// Quality factor
    #[serde(default = "defaults::notch_q")]
    pub q: f64,
    /// Number of harmonics notched, fundamental included
    #[serde(default = "defaults::notch_harmonics")]
    pub harmonics: u32,
}

/// Butterworth band-pass stage
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BandpassConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "defaults::bandpass_low")]
    pub low: f64,
    #[serde(default = "defaults::bandpass_high")]
    pub high: f64,
    #[serde(default = "defaults::bandpass_order")]
    pub order: usize,
}

/// Where and how the filtered stream is persisted
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RecordingConfig {
    #[serde(default)]
    pub output_folder: PathBuf,
    /// File stem; the `.csv` extension is appended
    #[serde(default)]
    pub filename: String,
    /// Replace an existing file instead of refusing to record
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    #[serde(default = "defaults::join_timeout_ms")]
    pub join_timeout_ms: u64,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn sample_rate_hz() -> u32 { signal::DEFAULT_SAMPLING_RATE_HZ }
    pub fn samples_per_update() -> usize { signal::DEFAULT_SAMPLES_PER_UPDATE }
    pub fn chunk_size() -> usize { signal::DEFAULT_CHUNK_SIZE }

    pub fn notch_f0() -> f64 { filters::DEFAULT_NOTCH_FREQ_HZ }
    pub fn notch_q() -> f64 { filters::DEFAULT_NOTCH_Q }
    pub fn notch_harmonics() -> u32 { filters::DEFAULT_NOTCH_HARMONICS }

    pub fn bandpass_low() -> f64 { filters::DEFAULT_BANDPASS_LOW_HZ }
    pub fn bandpass_high() -> f64 { filters::DEFAULT_BANDPASS_HIGH_HZ }
    pub fn bandpass_order() -> usize { filters::DEFAULT_BANDPASS_ORDER }

    pub fn queue_capacity() -> usize { recording::DEFAULT_QUEUE_CAPACITY }
    pub fn join_timeout_ms() -> u64 { recording::DEFAULT_JOIN_TIMEOUT_MS }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
            samples_per_update: defaults::samples_per_update(),
            chunk_size: defaults::chunk_size(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            center: false,
            notch: NotchConfig::default(),
            bandpass: BandpassConfig::default(),
        }
    }
}

impl Default for NotchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            f0: defaults::notch_f0(),
            q: defaults::notch_q(),
            harmonics: defaults::notch_harmonics(),
        }
    }
}

impl Default for BandpassConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            low: defaults::bandpass_low(),
            high: defaults::bandpass_high(),
            order: defaults::bandpass_order(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::new(),
            filename: String::new(),
            overwrite: false,
            queue_capacity: defaults::queue_capacity(),
            overflow_policy: OverflowPolicy::default(),
            join_timeout_ms: defaults::join_timeout_ms(),
        }
    }
}

impl FilterConfig {
    /// Every stage disabled
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// True when no stage would touch the window
    pub fn is_passthrough(&self) -> bool {
        !self.center && !self.notch.enabled && !self.bandpass.enabled
    }

    /// Range checks matching what the control surface allows.
    ///
    /// Only enabled stages are checked; a disabled stage may carry any values.
    pub fn validate(&self, sample_rate_hz: u32) -> Vec<String> {
        let mut errors = Vec::new();
        let nyquist = sample_rate_hz as f64 / 2.0;

        if self.notch.enabled {
            let n = &self.notch;
            if !(filters::MIN_NOTCH_FREQ_HZ..=filters::MAX_NOTCH_FREQ_HZ).contains(&n.f0) {
                errors.push(format!(
                    "Notch f0 {} Hz outside {}..={} Hz",
                    n.f0, filters::MIN_NOTCH_FREQ_HZ, filters::MAX_NOTCH_FREQ_HZ
                ));
            }
            if !(filters::MIN_NOTCH_Q..=filters::MAX_NOTCH_Q).contains(&n.q) {
                errors.push(format!(
                    "Notch Q {} outside {}..={}",
                    n.q, filters::MIN_NOTCH_Q, filters::MAX_NOTCH_Q
                ));
            }
            if n.harmonics == 0 || n.harmonics > filters::MAX_NOTCH_HARMONICS {
                errors.push(format!(
                    "Notch harmonics {} outside 1..={}",
                    n.harmonics, filters::MAX_NOTCH_HARMONICS
                ));
            } else if n.f0 * n.harmonics as f64 >= nyquist {
                errors.push(format!(
                    "Highest notch harmonic ({} Hz) must be below Nyquist ({} Hz)",
                    n.f0 * n.harmonics as f64, nyquist
                ));
            }
        }

        if self.bandpass.enabled {
            let b = &self.bandpass;
            if !(b.low.is_finite() && b.low > 0.0) {
                errors.push(format!("Band-pass low cutoff {} Hz must be positive", b.low));
            }
            if !(b.high.is_finite() && b.high > b.low) {
                errors.push(format!(
                    "Band-pass high cutoff {} Hz must exceed low cutoff {} Hz",
                    b.high, b.low
                ));
            }
            if b.high >= nyquist {
                errors.push(format!(
                    "Band-pass high cutoff ({} Hz) must be below Nyquist ({} Hz)",
                    b.high, nyquist
                ));
            }
            if !(filters::MIN_BANDPASS_ORDER..=filters::MAX_BANDPASS_ORDER).contains(&b.order) {
                errors.push(format!(
                    "Band-pass order {} outside {}..={}",
                    b.order, filters::MIN_BANDPASS_ORDER, filters::MAX_BANDPASS_ORDER
                ));
            }
        }

        errors
    }
}

impl RecordingConfig {
    /// `output_folder/filename.csv`
    pub fn resolve_path(&self) -> Result<PathBuf, ConfigError> {
        if self.output_folder.as_os_str().is_empty() || self.filename.trim().is_empty() {
            return Err(ConfigError::RecordingTarget(
                "Missing output folder or file name".to_string(),
            ));
        }

        let mut path = self.output_folder.join(self.filename.trim());
        let has_extension = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(recording::FILE_EXTENSION))
            .unwrap_or(false);
        if !has_extension {
            let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
            name.push(".");
            name.push(recording::FILE_EXTENSION);
            path.set_file_name(name);
        }
        Ok(path)
    }
}

impl AcquisitionConfig {
    /// Validate the whole snapshot, collecting every problem
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = self.serial.validate();

        let stream = &self.stream;
        if !(signal::MIN_SAMPLING_RATE_HZ..=signal::MAX_SAMPLING_RATE_HZ).contains(&stream.sample_rate_hz) {
            errors.push(format!("Invalid sample rate: {} Hz", stream.sample_rate_hz));
        }
        if stream.samples_per_update == 0 {
            errors.push("samples_per_update must be at least 1".to_string());
        }
        if !(signal::MIN_CHUNK_SIZE..=signal::MAX_CHUNK_SIZE).contains(&stream.chunk_size) {
            errors.push(format!(
                "chunk_size {} outside {}..={}",
                stream.chunk_size, signal::MIN_CHUNK_SIZE, signal::MAX_CHUNK_SIZE
            ));
        }
        if stream.chunk_size < stream.samples_per_update {
            errors.push(format!(
                "chunk_size ({}) must be >= samples_per_update ({})",
                stream.chunk_size, stream.samples_per_update
            ));
        }

        errors.extend(self.filters.validate(stream.sample_rate_hz));

        if self.recording.queue_capacity < recording::MIN_QUEUE_CAPACITY {
            errors.push("Recording queue capacity must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// First line written to every recording
    pub fn header_metadata(&self) -> String {
        format!("{}{}", recording::METADATA_PREFIX, self.stream.sample_rate_hz)
    }
}
