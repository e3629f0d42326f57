use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use emg_acquire::config::FilterConfig;
use emg_acquire::hal::protocol::encode_samples;
use emg_acquire::hal::simulator::{FrameSimulator, Pacing, SimulatorConfig};
use emg_acquire::hal::{ByteSource, ProtocolDecoder};
use emg_acquire::processing::FilterChain;

const SAMPLE_RATE_HZ: u32 = 10_000;
const CHUNK_SIZES: &[usize] = &[1_000, 10_000, 50_000];
const READ_SIZES: &[usize] = &[64, 512, 4096];

fn simulated_window(len: usize) -> Vec<f64> {
    let config = SimulatorConfig {
        sample_rate_hz: SAMPLE_RATE_HZ,
        pacing: Pacing::Burst,
        seed: Some(42),
        ..SimulatorConfig::default()
    };
    let mut sim = FrameSimulator::new(config);
    let mut bytes = vec![0u8; len * 2];
    let n = sim.read_available(&mut bytes).unwrap_or(0);
    ProtocolDecoder::new()
        .feed(&bytes[..n])
        .into_iter()
        .map(|v| v as f64)
        .collect()
}

fn benchmark_decoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder");
    let samples: Vec<i32> = (0..100_000).map(|i| (i % 16_384) - 8192).collect();
    let bytes = encode_samples(&samples);

    for &read_size in READ_SIZES {
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(BenchmarkId::new("feed", read_size), &read_size, |b, &size| {
            let mut out = Vec::with_capacity(samples.len());
            b.iter(|| {
                let mut decoder = ProtocolDecoder::new();
                out.clear();
                for chunk in bytes.chunks(size) {
                    decoder.feed_into(black_box(chunk), &mut out);
                }
                black_box(out.len())
            });
        });
    }

    group.finish();
}

fn benchmark_filter_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_chain");
    let chain = FilterChain::new(SAMPLE_RATE_HZ as f64);

    let mut full = FilterConfig::passthrough();
    full.center = true;
    full.notch.enabled = true;
    full.bandpass.enabled = true;
    full.bandpass.order = 4;

    let mut notch_only = FilterConfig::passthrough();
    notch_only.notch.enabled = true;

    for &chunk_size in CHUNK_SIZES {
        let window = simulated_window(chunk_size);
        group.throughput(Throughput::Elements(chunk_size as u64));

        group.bench_with_input(BenchmarkId::new("full_chain", chunk_size), &window, |b, w| {
            b.iter(|| chain.apply(black_box(w), &full))
        });
        group.bench_with_input(BenchmarkId::new("notch_only", chunk_size), &window, |b, w| {
            b.iter(|| chain.apply(black_box(w), &notch_only))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_decoder, benchmark_filter_chain);
criterion_main!(benches);
