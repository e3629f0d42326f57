// src/hal/serial_driver.rs
//! Serial amplifier driver built on the `serialport` crate

use crate::config::constants::serial::*;
use crate::error::{AcquireError, Result};
use crate::hal::traits::{ByteSource, PortConnector};
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{self, Read};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Serial link configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SerialConfig {
    #[serde(default = "defaults::port_name")]
    pub port_name: String,
    #[serde(default = "defaults::baud_rate")]
    pub baud_rate: u32,
    /// Upper bound on bytes pulled per read attempt
    #[serde(default = "defaults::read_chunk_bytes")]
    pub read_chunk_bytes: usize,
    /// Sleep between read attempts
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
}

mod defaults {
    use crate::config::constants::serial::*;

    pub fn port_name() -> String { DEFAULT_PORT.to_string() }
    pub fn baud_rate() -> u32 { DEFAULT_BAUD_RATE }
    pub fn read_chunk_bytes() -> usize { DEFAULT_READ_CHUNK_BYTES }
    pub fn poll_interval_ms() -> u64 { DEFAULT_POLL_INTERVAL_MS }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: defaults::port_name(),
            baud_rate: defaults::baud_rate(),
            read_chunk_bytes: defaults::read_chunk_bytes(),
            poll_interval_ms: defaults::poll_interval_ms(),
        }
    }
}

impl SerialConfig {
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Collect every configuration problem
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.port_name.trim().is_empty() {
            errors.push("Port name cannot be empty".to_string());
        }
        if self.baud_rate == 0 || self.baud_rate > MAX_BAUD_RATE {
            errors.push(format!("Invalid baud rate: {}", self.baud_rate));
        }
        if !(MIN_READ_CHUNK_BYTES..=MAX_READ_CHUNK_BYTES).contains(&self.read_chunk_bytes) {
            errors.push(format!("Invalid read chunk size: {} bytes", self.read_chunk_bytes));
        }
        if self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            errors.push(format!("Invalid poll interval: {} ms", self.poll_interval_ms));
        }

        errors
    }
}

/// Opens the configured serial port with a zero read timeout
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }
}

impl PortConnector for SerialConnector {
    fn connect(&self) -> Result<Box<dyn ByteSource>> {
        let port = serialport::new(&self.config.port_name, self.config.baud_rate)
            .timeout(Duration::ZERO)
            .open()
            .map_err(|e| AcquireError::connection(&self.config.port_name, e))?;

        info!(port = %self.config.port_name, baud = self.config.baud_rate, "Serial port opened");
        Ok(Box::new(SerialByteSource {
            port,
            name: self.config.port_name.clone(),
        }))
    }
}

/// Open serial port; closed on drop
pub struct SerialByteSource {
    port: Box<dyn SerialPort>,
    name: String,
}

impl ByteSource for SerialByteSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if available == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = available.min(buf.len());
        match self.port.read(&mut buf[..want]) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        format!("serial port {}", self.name)
    }
}

impl Drop for SerialByteSource {
    fn drop(&mut self) {
        debug!(port = %self.name, "Closing serial port");
    }
}

/// Names of the serial ports currently present on the system
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            warn!(error = %e, "Serial port enumeration failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_validation() {
        assert!(SerialConfig::default().validate().is_empty());

        let mut config = SerialConfig::default();
        config.port_name = String::new();
        assert_eq!(config.validate().len(), 1);

        let mut config = SerialConfig::default();
        config.baud_rate = 0;
        config.read_chunk_bytes = 1;
        assert_eq!(config.validate().len(), 2);
    }

    #[test]
    fn test_missing_port_reports_connection_error() {
        let connector = SerialConnector::new(SerialConfig::new("/dev/emg-acquire-does-not-exist", 230_400));
        match connector.connect() {
            Err(AcquireError::Connection { port, .. }) => {
                assert_eq!(port, "/dev/emg-acquire-does-not-exist");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opening a nonexistent port must fail"),
        }
    }

    #[test]
    fn test_port_listing_does_not_panic() {
        let _ = available_ports();
    }
}
