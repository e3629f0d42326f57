// src/hal/simulator.rs
//! Simulated amplifier byte streams
//!
//! [`FrameSimulator`] synthesizes an EMG-like signal (carrier tone, mains hum
//! with harmonics, white noise, DC offset), encodes it with the framing protocol
//! and optionally corrupts the stream so the decoder's resynchronization is
//! exercised. [`ReplaySource`] plays back scripted reads for deterministic tests.

use crate::config::constants::{protocol, signal};
use crate::error::Result;
use crate::hal::protocol::encode_sample;
use crate::hal::traits::{ByteSource, PortConnector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::io;
use std::time::Instant;

/// How the simulator releases samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Samples become available at `sample_rate_hz` of wall-clock time
    Realtime,
    /// Every read is filled as far as the buffer allows
    Burst,
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub sample_rate_hz: u32,
    pub carrier_freq_hz: f64,
    pub carrier_amplitude: f64,
    pub hum_freq_hz: f64,
    pub hum_amplitude: f64,
    /// Hum harmonics including the fundamental; amplitude halves per harmonic
    pub hum_harmonics: u32,
    pub noise_amplitude: f64,
    pub dc_offset: f64,
    /// Probability of injecting a stray byte before a frame
    pub corruption_probability: f64,
    pub pacing: Pacing,
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: signal::DEFAULT_SAMPLING_RATE_HZ,
            carrier_freq_hz: 120.0,
            carrier_amplitude: 1500.0,
            hum_freq_hz: 60.0,
            hum_amplitude: 800.0,
            hum_harmonics: 3,
            noise_amplitude: 50.0,
            dc_offset: 400.0,
            corruption_probability: 0.0,
            pacing: Pacing::Realtime,
            seed: None,
        }
    }
}

/// Synthetic amplifier stream
pub struct FrameSimulator {
    config: SimulatorConfig,
    rng: StdRng,
    sample_index: u64,
    started: Instant,
    carry: VecDeque<u8>,
}

impl FrameSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            sample_index: 0,
            started: Instant::now(),
            carry: VecDeque::new(),
        }
    }

    /// Noise-free value of the synthetic signal at sample `index`
    pub fn clean_value(config: &SimulatorConfig, index: u64) -> f64 {
        let t = index as f64 / config.sample_rate_hz as f64;
        let mut value = config.dc_offset + config.carrier_amplitude * (2.0 * PI * config.carrier_freq_hz * t).sin();

        let mut amplitude = config.hum_amplitude;
        for h in 1..=config.hum_harmonics {
            value += amplitude * (2.0 * PI * config.hum_freq_hz * h as f64 * t).sin();
            amplitude /= 2.0;
        }
        value
    }

    fn next_sample(&mut self) -> i32 {
        let mut value = Self::clean_value(&self.config, self.sample_index);
        if self.config.noise_amplitude > 0.0 {
            value += self.rng.gen_range(-self.config.noise_amplitude..=self.config.noise_amplitude);
        }
        self.sample_index += 1;
        (value.round() as i32).clamp(protocol::SAMPLE_MIN, protocol::SAMPLE_MAX)
    }

    fn samples_due(&self) -> u64 {
        match self.config.pacing {
            Pacing::Burst => u64::MAX,
            Pacing::Realtime => {
                let elapsed = self.started.elapsed().as_secs_f64();
                let due = (elapsed * self.config.sample_rate_hz as f64) as u64;
                due.saturating_sub(self.sample_index)
            }
        }
    }

    /// Samples generated so far
    pub fn samples_generated(&self) -> u64 {
        self.sample_index
    }
}

impl ByteSource for FrameSimulator {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;

        while written < buf.len() {
            if let Some(byte) = self.carry.pop_front() {
                buf[written] = byte;
                written += 1;
                continue;
            }
            if self.samples_due() == 0 {
                break;
            }

            if self.config.corruption_probability > 0.0
                && self.rng.gen_bool(self.config.corruption_probability.min(1.0))
            {
                self.carry.push_back(self.rng.gen_range(0x00..=0x7F));
            }
            let sample = self.next_sample();
            self.carry.extend(encode_sample(sample));
        }

        Ok(written)
    }

    fn describe(&self) -> String {
        format!("simulator @ {} Hz", self.config.sample_rate_hz)
    }
}

/// Opens a fresh [`FrameSimulator`] on every connect
#[derive(Debug, Clone, Default)]
pub struct SimulatorConnector {
    config: SimulatorConfig,
}

impl SimulatorConnector {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }
}

impl PortConnector for SimulatorConnector {
    fn connect(&self) -> Result<Box<dyn ByteSource>> {
        Ok(Box::new(FrameSimulator::new(self.config.clone())))
    }
}

/// Plays back a fixed list of reads, then reports nothing available
/// (or a read error, if one was scripted).
pub struct ReplaySource {
    reads: VecDeque<Vec<u8>>,
    fail_when_drained: Option<io::ErrorKind>,
}

impl ReplaySource {
    pub fn new(reads: Vec<Vec<u8>>) -> Self {
        Self {
            reads: reads.into(),
            fail_when_drained: None,
        }
    }

    /// Split `bytes` into reads of at most `read_size`
    pub fn chunked(bytes: &[u8], read_size: usize) -> Self {
        Self::new(bytes.chunks(read_size.max(1)).map(|c| c.to_vec()).collect())
    }

    /// Fail with `kind` once the script is exhausted
    pub fn then_fail(mut self, kind: io::ErrorKind) -> Self {
        self.fail_when_drained = Some(kind);
        self
    }
}

impl ByteSource for ReplaySource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(mut next) = self.reads.pop_front() else {
            return match self.fail_when_drained {
                Some(kind) => Err(io::Error::new(kind, "replay source exhausted")),
                None => Ok(0),
            };
        };

        if next.len() > buf.len() {
            let rest = next.split_off(buf.len());
            self.reads.push_front(rest);
        }
        buf[..next.len()].copy_from_slice(&next);
        Ok(next.len())
    }

    fn describe(&self) -> String {
        "replay source".to_string()
    }
}
