// src/processing/filters/zero_phase.rs
//! Forward-backward (zero-phase) application of second-order-section cascades
//!
//! The window is extended at both ends by odd reflection, each pass starts from
//! the cascade's steady state scaled to the first sample, and the padding is
//! stripped afterwards. This keeps edge transients out of the returned window.

use super::{FilterError, SecondOrderSection};

/// Default reflection length for a cascade of `n_sections` biquads
pub fn default_padlen(n_sections: usize) -> usize {
    3 * (2 * n_sections + 1)
}

/// Per-section initial state for a constant unit input through the whole cascade
pub fn steady_state_zi(sections: &[SecondOrderSection]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sections
        .iter()
        .map(|section| {
            let (zi, gain) = section.steady_state();
            let scaled = [zi[0] * scale, zi[1] * scale];
            scale *= gain;
            scaled
        })
        .collect()
}

/// Causal filtering in place, section by section (direct form II transposed)
pub fn sosfilt_in_place(sections: &[SecondOrderSection], data: &mut [f64], zi: &[[f64; 2]]) {
    for (k, s) in sections.iter().enumerate() {
        let [mut s1, mut s2] = zi.get(k).copied().unwrap_or([0.0, 0.0]);
        for x in data.iter_mut() {
            let input = *x;
            let y = s.b0 * input + s1;
            s1 = s.b1 * input - s.a1 * y + s2;
            s2 = s.b2 * input - s.a2 * y;
            *x = y;
        }
    }
}

/// Zero-phase filtering of `x` through `sections`.
///
/// The window must be longer than `padlen`; a shorter one is an error and the
/// caller keeps its input.
pub fn filtfilt(sections: &[SecondOrderSection], x: &[f64], padlen: usize) -> Result<Vec<f64>, FilterError> {
    let n = x.len();
    if sections.is_empty() {
        return Ok(x.to_vec());
    }
    if n <= padlen {
        return Err(FilterError::ProcessingError(format!(
            "window of {} samples is too short for a padding of {}",
            n, padlen
        )));
    }
    for section in sections {
        section.check_finite()?;
    }

    let mut ext = odd_extension(x, padlen);
    let zi = steady_state_zi(sections);

    let scale_zi = |first: f64| -> Vec<[f64; 2]> { zi.iter().map(|z| [z[0] * first, z[1] * first]).collect() };

    let forward_zi = scale_zi(ext[0]);
    sosfilt_in_place(sections, &mut ext, &forward_zi);

    ext.reverse();
    let backward_zi = scale_zi(ext[0]);
    sosfilt_in_place(sections, &mut ext, &backward_zi);
    ext.reverse();

    let out: Vec<f64> = ext[padlen..padlen + n].to_vec();
    if out.iter().any(|v| !v.is_finite()) {
        return Err(FilterError::ProcessingError(
            "filter output is not finite".to_string(),
        ));
    }
    Ok(out)
}

/// `x` extended by `padlen` odd-reflected samples on each side
fn odd_extension(x: &[f64], padlen: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];

    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));
    ext
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pole_lowpass() -> SecondOrderSection {
        // y[n] = 0.5 x[n] + 0.5 y[n-1]
        SecondOrderSection::new([0.5, 0.0, 0.0], [1.0, -0.5, 0.0]).unwrap()
    }

    #[test]
    fn test_odd_extension() {
        let ext = odd_extension(&[1.0, 2.0, 4.0, 7.0], 2);
        assert_eq!(ext, vec![-2.0, 0.0, 1.0, 2.0, 4.0, 7.0, 10.0, 12.0]);
    }

    #[test]
    fn test_constant_passes_through_unit_gain_filter() {
        let x = vec![3.5; 50];
        let y = filtfilt(&[one_pole_lowpass()], &x, default_padlen(1)).unwrap();
        for v in y {
            assert!((v - 3.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_phase_keeps_ramp_aligned() {
        // A causal low-pass would lag a ramp; the zero-phase pass must not.
        let x: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let y = filtfilt(&[one_pole_lowpass()], &x, default_padlen(1)).unwrap();
        for i in 20..180 {
            assert!((y[i] - x[i]).abs() < 1e-6, "sample {} drifted: {}", i, y[i]);
        }
    }

    #[test]
    fn test_window_must_exceed_padlen() {
        let sections = [one_pole_lowpass()];
        assert!(filtfilt(&sections, &[], 9).is_err());
        assert!(filtfilt(&sections, &[1.0; 9], 9).is_err());
        assert_eq!(filtfilt(&sections, &[1.0; 10], 9).unwrap().len(), 10);
        assert_eq!(filtfilt(&[], &[1.0, 2.0], 9).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_steady_state_zi_matches_settled_filter() {
        let sections = [one_pole_lowpass(), one_pole_lowpass()];
        let zi = steady_state_zi(&sections);
        let mut data = vec![1.0; 10];
        sosfilt_in_place(&sections, &mut data, &zi);
        for v in data {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }
}
