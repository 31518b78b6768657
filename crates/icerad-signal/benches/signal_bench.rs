//! Benchmarks for the hot paths of the signal chain.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use icerad_signal::{
    analytic_pulse, butterworth_filter_trace, fft, AmplitudeMode, NoiseConfig, NoiseGenerator,
};

fn bench_fft_round_trip(c: &mut Criterion) {
    let rate = 2.0;
    let samples: Vec<f64> = (0..4096)
        .map(|i| (0.3 * i as f64).sin() * (-(i as f64) / 2048.0).exp())
        .collect();

    c.bench_function("fft_round_trip_4096", |b| {
        b.iter(|| {
            let spec = fft::time2freq(black_box(&samples), rate);
            fft::freq2time(&spec, rate, samples.len())
        });
    });
}

fn bench_analytic_pulse(c: &mut Criterion) {
    c.bench_function("analytic_pulse_2048", |b| {
        b.iter(|| {
            analytic_pulse(
                black_box(1e9),
                -0.3,
                0.0,
                -100.0,
                2048,
                2.0,
                Some((0.1, 0.5)),
            )
            .unwrap()
        });
    });
}

fn bench_butterworth_filter(c: &mut Criterion) {
    let samples: Vec<f64> = (0..4096).map(|i| (0.1 * i as f64).sin()).collect();
    c.bench_function("butterworth_filter_4096", |b| {
        b.iter(|| butterworth_filter_trace(black_box(&samples), 2.0, (0.1, 0.5), 8).unwrap());
    });
}

fn bench_noise(c: &mut Criterion) {
    let mut gen = NoiseGenerator::new(
        NoiseConfig {
            min_freq: 0.1,
            max_freq: 0.5,
            rms: 0.01,
            mode: AmplitudeMode::Rayleigh,
        },
        1,
    );
    c.bench_function("bandlimited_noise_4096", |b| {
        b.iter(|| gen.bandlimited_noise(4096, 2.0).unwrap());
    });
}

criterion_group!(
    benches,
    bench_fft_round_trip,
    bench_analytic_pulse,
    bench_butterworth_filter,
    bench_noise
);
criterion_main!(benches);
