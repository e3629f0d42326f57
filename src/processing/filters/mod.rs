// src/processing/filters/mod.rs
//! Digital filters for EMG signal processing
//!
//! Every filter here is designed as a cascade of second-order sections and
//! applied forward-backward over a whole window, so the result has no phase
//! distortion.

pub mod iir;
pub mod notch;
pub mod zero_phase;

pub use iir::*;
pub use notch::*;
pub use zero_phase::*;

use num_complex::Complex64;
use thiserror::Error;

/// Filter design and application errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid coefficients: {0}")]
    InvalidCoefficients(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),
}

/// Normalized biquad (`a0 == 1`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondOrderSection {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl SecondOrderSection {
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Result<Self, FilterError> {
        let a0 = a[0];
        if a0 == 0.0 || !a0.is_finite() {
            return Err(FilterError::InvalidCoefficients(format!("a0 must be finite and non-zero, got {}", a0)));
        }
        let section = Self {
            b0: b[0] / a0,
            b1: b[1] / a0,
            b2: b[2] / a0,
            a1: a[1] / a0,
            a2: a[2] / a0,
        };
        section.check_finite()?;
        Ok(section)
    }

    pub fn check_finite(&self) -> Result<(), FilterError> {
        let all = [self.b0, self.b1, self.b2, self.a1, self.a2];
        if all.iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(FilterError::InvalidCoefficients(format!("non-finite coefficients {:?}", self)))
        }
    }

    /// Complex response at normalized angular frequency `omega` (rad/sample)
    pub fn response(&self, omega: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        num / den
    }

    /// Multiply the numerator by `gain`
    pub fn scaled(self, gain: f64) -> Self {
        Self {
            b0: self.b0 * gain,
            b1: self.b1 * gain,
            b2: self.b2 * gain,
            ..self
        }
    }

    /// Direct-form-II-transposed state reached after a constant unit input,
    /// with the section's DC gain. Used to start filtering without a step
    /// transient.
    pub fn steady_state(&self) -> ([f64; 2], f64) {
        let den = 1.0 + self.a1 + self.a2;
        if den.abs() < f64::EPSILON {
            // Pole at z = 1: no finite steady state
            return ([0.0, 0.0], 0.0);
        }
        let gain = (self.b0 + self.b1 + self.b2) / den;
        ([gain - self.b0, self.b2 - self.a2 * gain], gain)
    }
}

impl From<biquad::Coefficients<f64>> for SecondOrderSection {
    fn from(c: biquad::Coefficients<f64>) -> Self {
        Self {
            b0: c.b0,
            b1: c.b1,
            b2: c.b2,
            a1: c.a1,
            a2: c.a2,
        }
    }
}

/// Validate a sample rate and return its Nyquist frequency
pub(crate) fn nyquist(sample_rate_hz: f64) -> Result<f64, FilterError> {
    if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return Err(FilterError::InvalidParameters(format!(
            "Sample rate must be positive, got {}",
            sample_rate_hz
        )));
    }
    Ok(sample_rate_hz / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_normalizes_a0() {
        let s = SecondOrderSection::new([2.0, 4.0, 2.0], [2.0, 1.0, 0.5]).unwrap();
        assert_eq!(s.b0, 1.0);
        assert_eq!(s.a1, 0.5);
        assert!(SecondOrderSection::new([1.0, 0.0, 0.0], [0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_steady_state_of_identity() {
        let identity = SecondOrderSection::new([1.0, 0.0, 0.0], [1.0, 0.0, 0.0]).unwrap();
        let (zi, gain) = identity.steady_state();
        assert_eq!(gain, 1.0);
        assert_eq!(zi, [0.0, 0.0]);
        assert!((identity.response(0.3).norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nyquist_rejects_bad_rates() {
        assert_eq!(nyquist(1000.0).unwrap(), 500.0);
        assert!(nyquist(0.0).is_err());
        assert!(nyquist(f64::NAN).is_err());
    }
}
