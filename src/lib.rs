//! emg-acquire: serial EMG acquisition, decoding, filtering and recording
//!
//! A single-channel amplifier streams two-byte frames over a serial link. This
//! crate decodes them, filters a sliding window with zero-phase filters, hands
//! the newest filtered samples to a consumer and optionally records them to a
//! CSV file without blocking acquisition.
//!
//! - Byte sources for a real serial port and for a simulated amplifier
//! - Framing decoder with resynchronization on malformed input
//! - Center / notch / band-pass filter chain configured per cycle
//! - Bounded, non-blocking recorder with its own writer thread
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use emg_acquire::acquisition::{AcquisitionController, ChannelSink};
//! use emg_acquire::config::AcquisitionConfig;
//! use emg_acquire::hal::simulator::{SimulatorConfig, SimulatorConnector};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AcquisitionConfig::default();
//!     let (sink, receivers) = ChannelSink::bounded(64);
//!     let controller = AcquisitionController::new(
//!         config,
//!         SimulatorConnector::new(SimulatorConfig::default()),
//!         Arc::new(sink),
//!     )?;
//!
//!     controller.start()?;
//!     for _ in 0..10 {
//!         let chunk = receivers.chunks.recv()?;
//!         println!("chunk {}: {} samples", chunk.sequence, chunk.samples.len());
//!     }
//!     controller.stop();
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod processing;
pub mod recording;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{
    AcquisitionController, AcquisitionState, AcquisitionStats, AcquisitionStatus, ChannelSink,
    ChunkSink, DataProvider, SampleChunk,
};
pub use crate::config::{AcquisitionConfig, FilterConfig, RecordingConfig};
pub use error::{AcquireError, Result};
pub use hal::{ByteSource, PortConnector, ProtocolDecoder};
pub use processing::FilterChain;
pub use recording::{OverflowPolicy, Recorder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Serial EMG acquisition with zero-phase filtering and CSV recording".to_string(),
        features: vec![
            "Two-byte frame decoding with resynchronization".to_string(),
            "Center, notch and band-pass filter chain".to_string(),
            "Non-blocking CSV recording".to_string(),
            "Serial port and simulated amplifier sources".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
