// src/processing/filter_chain.rs
//! Per-cycle filter chain: center → notch → band-pass
//!
//! Each stage is independently togglable from the [`FilterConfig`] snapshot and
//! runs over the whole window. A stage that fails leaves the window as it stood
//! before that stage; the stages after it are skipped for this cycle.

use crate::config::FilterConfig;
use crate::processing::filters::{bandpass_zero_phase, notch_harmonics, FilterError};
use std::fmt;
use tracing::warn;

/// Stage identifiers, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    Center,
    Notch,
    Bandpass,
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterStage::Center => "center",
            FilterStage::Notch => "notch",
            FilterStage::Bandpass => "bandpass",
        };
        f.write_str(name)
    }
}

/// A stage that failed during one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct StageFault {
    pub stage: FilterStage,
    pub error: FilterError,
}

/// Filtered window plus the fault that cut the chain short, if any
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutput {
    pub samples: Vec<f64>,
    pub fault: Option<StageFault>,
}

/// Stateless filter chain bound to a sample rate
#[derive(Debug, Clone, Copy)]
pub struct FilterChain {
    sample_rate_hz: f64,
}

impl FilterChain {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self { sample_rate_hz }
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    /// Filter `window`; output has the same length as the input.
    pub fn apply(&self, window: &[f64], config: &FilterConfig) -> Vec<f64> {
        self.apply_with_report(window, config).samples
    }

    /// Same as [`apply`](Self::apply), also reporting a failed stage
    pub fn apply_with_report(&self, window: &[f64], config: &FilterConfig) -> FilterOutput {
        let mut data = window.to_vec();

        if config.center {
            center_in_place(&mut data);
        }

        if config.notch.enabled {
            match notch_harmonics(&data, &config.notch, self.sample_rate_hz) {
                Ok(filtered) => data = filtered,
                Err(error) => return Self::fault(data, FilterStage::Notch, error),
            }
        }

        if config.bandpass.enabled {
            match bandpass_zero_phase(&data, &config.bandpass, self.sample_rate_hz) {
                Ok(filtered) => data = filtered,
                Err(error) => return Self::fault(data, FilterStage::Bandpass, error),
            }
        }

        FilterOutput { samples: data, fault: None }
    }

    fn fault(samples: Vec<f64>, stage: FilterStage, error: FilterError) -> FilterOutput {
        warn!("Filter stage '{}' failed, keeping its input: {}", stage, error);
        FilterOutput {
            samples,
            fault: Some(StageFault { stage, error }),
        }
    }
}

/// Subtract the window mean
pub fn center_in_place(data: &mut [f64]) {
    if data.is_empty() {
        return;
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    for v in data.iter_mut() {
        *v -= mean;
    }
}
