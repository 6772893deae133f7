//! Performance benchmarks for the DSP module
//!
//! Run with: cargo bench -p eqscope_dsp

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use eqscope_dsp::{
    evaluate_response, ChainSettings, FftOrder, Slope, SpectrumGenerator, StereoChain, WindowKind,
};

fn steep_settings() -> ChainSettings {
    ChainSettings {
        low_cut_freq: 80.0,
        high_cut_freq: 12000.0,
        peak_freq: 1500.0,
        peak_gain_db: 4.0,
        low_cut_slope: Slope::Db48,
        high_cut_slope: Slope::Db48,
        ..Default::default()
    }
}

fn benchmark_chain_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_chain");

    // Common buffer sizes in audio applications
    let buffer_sizes = [64, 128, 256, 512, 1024, 2048];

    for size in buffer_sizes {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("process_planar_{}_frames_all_stages", size), |b| {
            let mut chain = StereoChain::new(48000.0);
            chain.update_filters(&steep_settings()).unwrap();
            let mut left: Vec<f32> = (0..size).map(|i| (i as f32 * 0.001).sin()).collect();
            let mut right: Vec<f32> = (0..size).map(|i| (i as f32 * 0.002).sin()).collect();

            b.iter(|| {
                chain.process_planar(black_box(&mut left), black_box(&mut right));
            });
        });
    }

    group.finish();
}

fn benchmark_coefficient_update(c: &mut Criterion) {
    c.bench_function("chain_update_filters", |b| {
        let chain = StereoChain::new(48000.0);
        let mut settings = steep_settings();
        let mut gain = 0.0_f32;

        b.iter(|| {
            // Simulate dragging the peak gain slider
            settings.peak_gain_db = gain;
            chain.update_filters(black_box(&settings)).unwrap();
            gain = (gain + 0.5) % 24.0;
        });
    });
}

fn benchmark_analysis(c: &mut Criterion) {
    c.bench_function("spectrum_process_block_512", |b| {
        let mut generator = SpectrumGenerator::new(FftOrder::Order2048, WindowKind::BlackmanHarris);
        let block: Vec<f32> = (0..512).map(|i| (i as f32 * 0.01).sin()).collect();

        b.iter(|| {
            generator.process_block(black_box(&block), 48000.0, -48.0);
            black_box(generator.pop_frame());
        });
    });

    c.bench_function("response_curve_600_points", |b| {
        let chain = StereoChain::new(48000.0);
        chain.update_filters(&steep_settings()).unwrap();
        let snapshot = chain.controls().snapshot();

        b.iter(|| black_box(evaluate_response(&snapshot, 600, 48000.0)));
    });
}

criterion_group!(
    benches,
    benchmark_chain_processing,
    benchmark_coefficient_update,
    benchmark_analysis
);

criterion_main!(benches);
