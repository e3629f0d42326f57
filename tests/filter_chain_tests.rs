// tests/filter_chain_tests.rs
//! Filter chain behaviour on synthetic windows

use emg_acquire::config::FilterConfig;
use emg_acquire::processing::{FilterChain, FilterStage};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::PI;

const FS: f64 = 10_000.0;

fn tone(freq_hz: f64, amplitude: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / FS).sin())
        .collect()
}

fn bin_magnitude(x: &[f64], freq_hz: f64) -> f64 {
    let n = x.len();
    let mut buf: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    FftPlanner::<f64>::new().plan_fft_forward(n).process(&mut buf);
    let bin = (freq_hz * n as f64 / FS).round() as usize;
    buf[bin].norm()
}

fn rms(x: &[f64]) -> f64 {
    (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
}

#[test]
fn all_stages_disabled_returns_input_exactly() {
    let input: Vec<f64> = (0..1000).map(|i| ((i * 7919) % 2048) as f64 - 1024.0).collect();
    let output = FilterChain::new(FS).apply(&input, &FilterConfig::passthrough());
    assert_eq!(output, input);
}

#[test]
fn centering_only_removes_the_mean() {
    let input: Vec<f64> = tone(37.0, 300.0, 2000).iter().map(|v| v + 812.5).collect();
    let config = FilterConfig {
        center: true,
        ..FilterConfig::passthrough()
    };
    let output = FilterChain::new(FS).apply(&input, &config);

    let mean = output.iter().sum::<f64>() / output.len() as f64;
    assert!(mean.abs() < 1e-9, "mean = {}", mean);
    assert_eq!(output.len(), input.len());
}

#[test]
fn notch_attenuates_mains_tone_by_more_than_20_db() {
    let n = 40_000;
    let input = tone(60.0, 1000.0, n);
    let mut config = FilterConfig::passthrough();
    config.notch.enabled = true;

    let output = FilterChain::new(FS).apply(&input, &config);

    // Settled centre of the window
    let before = bin_magnitude(&input[10_000..30_000], 60.0);
    let after = bin_magnitude(&output[10_000..30_000], 60.0);
    let attenuation_db = 20.0 * (before / after).log10();
    assert!(attenuation_db > 20.0, "attenuation {} dB", attenuation_db);
}

#[test]
fn notch_keeps_distant_content() {
    let n = 40_000;
    let input: Vec<f64> = tone(60.0, 500.0, n)
        .iter()
        .zip(tone(1000.0, 500.0, n))
        .map(|(a, b)| a + b)
        .collect();
    let mut config = FilterConfig::passthrough();
    config.notch.enabled = true;

    let output = FilterChain::new(FS).apply(&input, &config);
    let before = bin_magnitude(&input[10_000..30_000], 1000.0);
    let after = bin_magnitude(&output[10_000..30_000], 1000.0);
    assert!((after / before - 1.0).abs() < 0.02);
}

#[test]
fn bandpass_keeps_in_band_tone_and_removes_dc() {
    let n = 10_000;
    let input: Vec<f64> = tone(150.0, 1000.0, n).iter().map(|v| v + 500.0).collect();
    let mut config = FilterConfig::passthrough();
    config.bandpass.enabled = true;

    let output = FilterChain::new(FS).apply(&input, &config);
    let settled = &output[2000..8000];

    let mean = settled.iter().sum::<f64>() / settled.len() as f64;
    assert!(mean.abs() < 1.0, "residual DC {}", mean);

    let ratio = rms(settled) / rms(&tone(150.0, 1000.0, n)[2000..8000]);
    assert!(ratio > 0.95 && ratio < 1.05, "in-band gain {}", ratio);
}

#[test]
fn bandpass_guard_returns_short_window_unmodified() {
    let mut config = FilterConfig::passthrough();
    config.bandpass.enabled = true;
    config.bandpass.order = 4;

    let input: Vec<f64> = (0..11).map(|i| (i * i) as f64).collect();
    let output = FilterChain::new(FS).apply(&input, &config);
    assert_eq!(output, input);
}

#[test]
fn invalid_bandpass_leaves_window_as_before_that_stage() {
    let input: Vec<f64> = tone(60.0, 200.0, 5000).iter().map(|v| v + 40.0).collect();
    let chain = FilterChain::new(FS);

    let mut upstream = FilterConfig::passthrough();
    upstream.center = true;
    upstream.notch.enabled = true;
    let expected = chain.apply(&input, &upstream);

    let mut config = upstream.clone();
    config.bandpass.enabled = true;
    config.bandpass.high = 6000.0;

    let report = chain.apply_with_report(&input, &config);
    assert_eq!(report.samples, expected);
    assert_eq!(report.fault.map(|f| f.stage), Some(FilterStage::Bandpass));
}

#[test]
fn invalid_notch_leaves_centered_window() {
    let input: Vec<f64> = (0..3000).map(|i| (i % 50) as f64).collect();
    let chain = FilterChain::new(1000.0);

    let mut config = FilterConfig::passthrough();
    config.center = true;
    config.notch.enabled = true;
    config.notch.f0 = 100.0;
    config.notch.harmonics = 5;

    let report = chain.apply_with_report(&input, &config);
    let mean = input.iter().sum::<f64>() / input.len() as f64;
    let centered: Vec<f64> = input.iter().map(|v| v - mean).collect();

    assert_eq!(report.samples, centered);
    assert_eq!(report.fault.map(|f| f.stage), Some(FilterStage::Notch));
}

#[test]
fn window_shorter_than_notch_padding_keeps_centered_input() {
    // A single notch reflects 9 samples per side, so 9 samples cannot be filtered
    let input = vec![4.0, 1.0, -2.0, 7.0, 3.0, 0.0, 5.0, -1.0, 2.0];
    let mut config = FilterConfig::passthrough();
    config.center = true;
    config.notch.enabled = true;
    config.notch.harmonics = 1;

    let report = FilterChain::new(FS).apply_with_report(&input, &config);
    let mean = input.iter().sum::<f64>() / input.len() as f64;
    let centered: Vec<f64> = input.iter().map(|v| v - mean).collect();

    assert_eq!(report.samples, centered);
    assert_eq!(report.fault.map(|f| f.stage), Some(FilterStage::Notch));
}

#[test]
fn bandpass_between_guard_and_padding_falls_back() {
    // Order 2 guards below 6 samples but reflects 15 per side
    let mut config = FilterConfig::passthrough();
    config.bandpass.enabled = true;
    config.bandpass.order = 2;

    let input: Vec<f64> = (0..12).map(|i| (i * 3 % 7) as f64).collect();
    let report = FilterChain::new(FS).apply_with_report(&input, &config);
    assert_eq!(report.samples, input);
    assert_eq!(report.fault.map(|f| f.stage), Some(FilterStage::Bandpass));
}
