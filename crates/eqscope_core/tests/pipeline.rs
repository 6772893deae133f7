//! End-to-end tests: parameter store -> filters -> processor -> analyzer.

use std::time::{Duration, Instant};

use eqscope_core::{EngineConfig, EqEngine, Event, ParameterId, Pipeline, PlotBounds, Slope};
use eqscope_dsp::{chain_magnitude_at, map_from_log10, ChainSnapshot, StagePosition};

const SAMPLE_RATE: f64 = 48000.0;

fn db_at(snapshot: &ChainSnapshot, frequency: f64) -> f64 {
    20.0 * chain_magnitude_at(snapshot, frequency, SAMPLE_RATE).log10()
}

fn sine_block(frequency: f32, frames: usize, start: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = (start + i) as f32 / SAMPLE_RATE as f32;
            0.5 * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

#[test]
fn test_peak_boost_through_parameter_store() {
    let mut pipeline = Pipeline::prepare(&EngineConfig::default()).unwrap();
    let params = &pipeline.params;
    params.set(ParameterId::PeakFreq, 1000.0);
    params.set(ParameterId::PeakGain, 6.0);
    params.set(ParameterId::PeakQuality, 1.0);
    params.set_bool(ParameterId::LowCutBypassed, true);
    params.set_bool(ParameterId::HighCutBypassed, true);

    let summary = pipeline.analyzer.tick();
    assert!(summary.filters_updated.is_some());

    let snapshot = pipeline.analyzer.handle().chain_snapshot();
    assert!((db_at(&snapshot, 1000.0) - 6.0).abs() < 0.1);
    assert!(db_at(&snapshot, 20.0).abs() < 0.5);
    assert!(db_at(&snapshot, 20000.0).abs() < 0.5);
}

#[test]
fn test_steep_low_cut_through_parameter_store() {
    let mut pipeline = Pipeline::prepare(&EngineConfig::default()).unwrap();
    let params = &pipeline.params;
    params.set(ParameterId::LowCutFreq, 100.0);
    params.set(ParameterId::LowCutSlope, Slope::Db48.index() as f32);
    params.set_bool(ParameterId::PeakBypassed, true);
    params.set_bool(ParameterId::HighCutBypassed, true);
    pipeline.analyzer.tick();

    let snapshot = pipeline.analyzer.handle().chain_snapshot();
    let active = StagePosition::LOW_CUT
        .iter()
        .filter(|s| !snapshot.is_bypassed(**s))
        .count();
    assert_eq!(active, 4);

    let passband = db_at(&snapshot, 10000.0);
    assert!(passband.abs() < 0.5);
    assert!(db_at(&snapshot, 10.0) - passband < -40.0);
}

#[test]
fn test_slope_change_toggles_only_the_difference() {
    let mut pipeline = Pipeline::prepare(&EngineConfig::default()).unwrap();
    pipeline.params.set(ParameterId::HighCutSlope, Slope::Db24.index() as f32);
    pipeline.analyzer.tick();
    let before = pipeline.analyzer.handle().chain_snapshot();

    pipeline.params.set(ParameterId::HighCutSlope, Slope::Db48.index() as f32);
    pipeline.analyzer.tick();
    let after = pipeline.analyzer.handle().chain_snapshot();

    let toggled = StagePosition::HIGH_CUT
        .iter()
        .filter(|s| before.is_bypassed(**s) != after.is_bypassed(**s))
        .count();
    assert_eq!(toggled, 2);

    let untouched_low_cut = StagePosition::LOW_CUT
        .iter()
        .all(|s| before.is_bypassed(*s) == after.is_bypassed(*s));
    assert!(untouched_low_cut);
}

#[test]
fn test_spectrum_peak_lands_at_tone_frequency() {
    let mut pipeline = Pipeline::prepare(&EngineConfig::default()).unwrap();
    // Flat chain so the tone reaches the analyzer unchanged
    pipeline.params.set_bool(ParameterId::LowCutBypassed, true);
    pipeline.params.set_bool(ParameterId::PeakBypassed, true);
    pipeline.params.set_bool(ParameterId::HighCutBypassed, true);
    pipeline.analyzer.tick();

    for block in 0..8 {
        let mut left = sine_block(1000.0, 512, block * 512);
        let mut right = left.clone();
        let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
        pipeline.processor.process(&mut channels);
    }
    let summary = pipeline.analyzer.tick();
    assert_eq!(summary.blocks_consumed, 8);
    assert_eq!(summary.spectrum_channels, vec![0, 1]);

    let bounds = PlotBounds::default();
    let path = pipeline.analyzer.get_spectrum_path(0).unwrap();
    let loudest = path
        .points()
        .iter()
        .min_by(|a, b| a.y.total_cmp(&b.y))
        .unwrap();

    let expected_x = (map_from_log10(1000.0, 20.0, 20000.0) * bounds.width as f64) as f32;
    assert!(
        (loudest.x - expected_x).abs() < 10.0,
        "loudest point at x={} expected near {}",
        loudest.x,
        expected_x
    );
    for point in path.points() {
        assert!(point.y >= bounds.top() && point.y <= bounds.bottom());
    }
}

#[test]
fn test_response_curve_width_and_bypass_flatness() {
    let mut pipeline = Pipeline::prepare(&EngineConfig::default()).unwrap();
    pipeline.params.set(ParameterId::PeakGain, 12.0);
    pipeline.params.set_bool(ParameterId::LowCutBypassed, true);
    pipeline.params.set_bool(ParameterId::PeakBypassed, true);
    pipeline.params.set_bool(ParameterId::HighCutBypassed, true);
    pipeline.analyzer.tick();

    let curve = pipeline.analyzer.get_response_curve(400, SAMPLE_RATE);
    assert_eq!(curve.len(), 400);

    // Everything bypassed: 0 dB sits exactly half way down the plot
    let middle = PlotBounds::default().height / 2.0;
    assert!(curve.points().iter().all(|p| p.y == middle));
}

#[test]
fn test_engine_reports_filter_updates_and_spectrum() {
    let config = EngineConfig {
        refresh_hz: 120,
        ..Default::default()
    };
    let (engine, mut processor) = EqEngine::prepare(config).unwrap();
    engine.set_parameter(ParameterId::PeakGain, 6.0);

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut filters_seen = false;
    let mut spectrum_seen = false;
    let mut position = 0;

    while Instant::now() < deadline && !(filters_seen && spectrum_seen) {
        let mut left = sine_block(440.0, 512, position);
        let mut right = left.clone();
        position += 512;
        {
            let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
            processor.process(&mut channels);
        }

        while let Some(event) = engine.wait_event_timeout(Duration::from_millis(2)) {
            match event {
                Event::FiltersUpdated { settings } if settings.peak_gain_db == 6.0 => {
                    filters_seen = true;
                }
                Event::SpectrumUpdated { points, .. } if !points.is_empty() => {
                    spectrum_seen = true;
                }
                _ => {}
            }
        }
    }

    assert!(filters_seen, "no FiltersUpdated event");
    assert!(spectrum_seen, "no SpectrumUpdated event");
    assert!(!engine.get_spectrum_path(0).unwrap().is_empty());
}
