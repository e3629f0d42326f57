// src/processing/filters/iir.rs
//! Butterworth band-pass design
//!
//! Analog Butterworth prototype → low-pass to band-pass transform → bilinear
//! transform, grouped into second-order sections. An order-`N` band-pass has
//! `2N` poles and therefore `N` sections; each section carries one zero at
//! `z = 1` and one at `z = -1` and is scaled to unit gain at the band center.

use super::zero_phase::{default_padlen, filtfilt};
use super::{nyquist, FilterError, SecondOrderSection};
use crate::config::constants::filters::BANDPASS_MIN_SAMPLES_PER_ORDER;
use crate::config::BandpassConfig;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Bilinear transform constant for a sample rate normalized to 2
const BILINEAR_K: f64 = 4.0;

/// Imaginary parts below this are treated as real poles
const REAL_POLE_TOLERANCE: f64 = 1e-12;

/// Design an order-`order` Butterworth band-pass between `low_hz` and `high_hz`
pub fn butterworth_bandpass(
    order: usize,
    low_hz: f64,
    high_hz: f64,
    sample_rate_hz: f64,
) -> Result<Vec<SecondOrderSection>, FilterError> {
    let nyq = nyquist(sample_rate_hz)?;
    if order == 0 {
        return Err(FilterError::InvalidParameters("Order must be at least 1".to_string()));
    }
    if !low_hz.is_finite() || !high_hz.is_finite() || low_hz <= 0.0 {
        return Err(FilterError::InvalidParameters(format!(
            "Cutoffs must be finite and positive, got {} / {} Hz",
            low_hz, high_hz
        )));
    }
    if low_hz >= high_hz {
        return Err(FilterError::InvalidParameters(
            "Low cutoff must be less than high cutoff".to_string(),
        ));
    }
    if high_hz >= nyq {
        return Err(FilterError::InvalidParameters(format!(
            "High cutoff {} Hz must be below Nyquist ({} Hz)",
            high_hz, nyq
        )));
    }

    // Pre-warp
    let wl = BILINEAR_K * (PI * low_hz / sample_rate_hz).tan();
    let wh = BILINEAR_K * (PI * high_hz / sample_rate_hz).tan();
    let bw = wh - wl;
    let wo = (wl * wh).sqrt();

    let mut digital_poles = Vec::with_capacity(2 * order);
    for pole in analog_prototype_poles(order) {
        let p_lp = pole * (bw / 2.0);
        let d = (p_lp * p_lp - wo * wo).sqrt();
        for p in [p_lp + d, p_lp - d] {
            digital_poles.push((BILINEAR_K + p) / (BILINEAR_K - p));
        }
    }

    let omega_center = 2.0 * (wo / BILINEAR_K).atan();
    let sections = pair_poles(&digital_poles)?
        .into_iter()
        .map(|a| {
            let section = SecondOrderSection::new([1.0, 0.0, -1.0], a)?;
            let gain = section.response(omega_center).norm();
            if !gain.is_finite() || gain <= f64::EPSILON {
                return Err(FilterError::InvalidCoefficients(format!(
                    "degenerate section gain {} at band center",
                    gain
                )));
            }
            Ok(section.scaled(1.0 / gain))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if sections.len() != order {
        return Err(FilterError::InvalidCoefficients(format!(
            "expected {} sections, built {}",
            order,
            sections.len()
        )));
    }
    Ok(sections)
}

/// Zero-phase band-pass over a window.
///
/// Windows shorter than `3 * order` samples come back unmodified: the
/// forward-backward pass cannot settle on them.
pub fn bandpass_zero_phase(
    window: &[f64],
    config: &BandpassConfig,
    sample_rate_hz: f64,
) -> Result<Vec<f64>, FilterError> {
    if window.len() < BANDPASS_MIN_SAMPLES_PER_ORDER * config.order {
        return Ok(window.to_vec());
    }
    let sections = butterworth_bandpass(config.order, config.low, config.high, sample_rate_hz)?;
    filtfilt(&sections, window, default_padlen(sections.len()))
}

/// Left-half-plane poles of the normalized analog Butterworth low-pass
fn analog_prototype_poles(order: usize) -> Vec<Complex64> {
    let n = order as i64;
    (0..n)
        .map(|k| {
            let m = -(n - 1) + 2 * k;
            -Complex64::from_polar(1.0, PI * m as f64 / (2.0 * order as f64))
        })
        .collect()
}

/// Group a conjugate-closed pole set into denominator polynomials `[1, a1, a2]`
fn pair_poles(poles: &[Complex64]) -> Result<Vec<[f64; 3]>, FilterError> {
    let mut denominators = Vec::with_capacity(poles.len() / 2);
    let mut real_poles = Vec::new();

    for p in poles {
        if p.im.abs() <= REAL_POLE_TOLERANCE {
            real_poles.push(p.re);
        } else if p.im > 0.0 {
            denominators.push([1.0, -2.0 * p.re, p.norm_sqr()]);
        }
    }

    if real_poles.len() % 2 != 0 {
        return Err(FilterError::InvalidCoefficients(
            "odd number of real poles".to_string(),
        ));
    }
    real_poles.sort_by(|a, b| a.total_cmp(b));
    for pair in real_poles.chunks(2) {
        denominators.push([1.0, -(pair[0] + pair[1]), pair[0] * pair[1]]);
    }

    if poles.iter().any(|p| p.norm() >= 1.0) {
        return Err(FilterError::InvalidCoefficients(
            "pole outside the unit circle".to_string(),
        ));
    }
    Ok(denominators)
}
