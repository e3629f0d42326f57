// src/processing/filters/notch.rs
//! Power line notch with harmonics

use super::zero_phase::{default_padlen, filtfilt};
use super::{nyquist, FilterError, SecondOrderSection};
use crate::config::NotchConfig;
use biquad::{Coefficients, ToHertz, Type};

/// Single notch biquad at `freq_hz` with quality factor `q`
pub fn notch_section(freq_hz: f64, q: f64, sample_rate_hz: f64) -> Result<SecondOrderSection, FilterError> {
    let nyq = nyquist(sample_rate_hz)?;
    if !freq_hz.is_finite() || freq_hz <= 0.0 {
        return Err(FilterError::InvalidParameters(format!(
            "Notch frequency must be positive, got {}",
            freq_hz
        )));
    }
    if freq_hz >= nyq {
        return Err(FilterError::InvalidParameters(format!(
            "Notch frequency {} Hz must be below Nyquist ({} Hz)",
            freq_hz, nyq
        )));
    }
    if !q.is_finite() || q <= 0.0 {
        return Err(FilterError::InvalidParameters(format!("Q factor must be positive, got {}", q)));
    }

    let coeffs = Coefficients::<f64>::from_params(Type::Notch, sample_rate_hz.hz(), freq_hz.hz(), q)
        .map_err(|e| FilterError::InvalidParameters(format!("notch design failed: {:?}", e)))?;
    let section = SecondOrderSection::from(coeffs);
    section.check_finite()?;
    Ok(section)
}

/// Notch `f0 * h` for `h = 1..=harmonics`, each harmonic applied zero-phase
/// in turn.
///
/// Any harmonic that cannot be designed fails the whole stage; the caller
/// keeps the window it passed in.
pub fn notch_harmonics(window: &[f64], config: &NotchConfig, sample_rate_hz: f64) -> Result<Vec<f64>, FilterError> {
    if config.harmonics == 0 {
        return Err(FilterError::InvalidParameters("At least one harmonic is required".to_string()));
    }

    let sections = (1..=config.harmonics)
        .map(|h| notch_section(config.f0 * h as f64, config.q, sample_rate_hz))
        .collect::<Result<Vec<_>, _>>()?;

    let mut data = window.to_vec();
    for section in &sections {
        data = filtfilt(std::slice::from_ref(section), &data, default_padlen(1))?;
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq_hz: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq_hz * i as f64 / fs).sin()).collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_notch_zero_at_center() {
        let fs = 10_000.0;
        let section = notch_section(60.0, 30.0, fs).unwrap();
        assert!(section.response(2.0 * PI * 60.0 / fs).norm() < 1e-9);
        assert!((section.response(2.0 * PI * 1000.0 / fs).norm() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_harmonics_removed_from_window() {
        let fs = 10_000.0;
        let n = 40_000;
        let config = NotchConfig {
            enabled: true,
            f0: 60.0,
            q: 30.0,
            harmonics: 3,
        };
        let hum: Vec<f64> = tone(60.0, fs, n)
            .iter()
            .zip(tone(180.0, fs, n))
            .map(|(a, b)| a + 0.5 * b)
            .collect();

        let out = notch_harmonics(&hum, &config, fs).unwrap();
        // Q = 30 rings for a fraction of a second at each end
        let mid = &out[15_000..35_000];
        assert!(rms(mid) < 0.05 * rms(&hum[15_000..35_000]));
    }

    #[test]
    fn test_harmonic_above_nyquist_fails_stage() {
        let config = NotchConfig {
            enabled: true,
            f0: 60.0,
            q: 30.0,
            harmonics: 10,
        };
        // 600 Hz is at Nyquist for 1200 Hz sampling
        let window = vec![1.0; 100];
        assert!(notch_harmonics(&window, &config, 1200.0).is_err());
    }

    #[test]
    fn test_invalid_q_rejected() {
        assert!(notch_section(60.0, 0.0, 10_000.0).is_err());
        assert!(notch_section(60.0, f64::NAN, 10_000.0).is_err());
        assert!(notch_section(-60.0, 30.0, 10_000.0).is_err());
    }
}
