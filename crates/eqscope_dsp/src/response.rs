//! Response-Curve Evaluator
//!
//! Evaluates the combined magnitude response of every active chain slot
//! analytically, one point per horizontal pixel, for the static overlay.
//! Works from a [`ChainSnapshot`] so the live chain is never touched.

use biquad::Coefficients;

use crate::chain::ChainSnapshot;
use crate::coefficients::gain_to_db;
use crate::path::{map_to_log10, remap, PlotBounds, Point, RenderPath};
use crate::settings::{MAX_FREQUENCY, MIN_FREQUENCY};

/// Vertical range of the response overlay (dB, symmetric around 0)
pub const RESPONSE_RANGE_DB: f64 = 24.0;

/// Floor for fully attenuated points
const RESPONSE_FLOOR_DB: f64 = -200.0;

/// Linear gain of one biquad at `frequency`
///
/// |H(e^jω)| with H(z) = (b0 + b1 z⁻¹ + b2 z⁻²) / (1 + a1 z⁻¹ + a2 z⁻²)
pub fn magnitude_at(coefficients: &Coefficients<f32>, frequency: f64, sample_rate: f64) -> f64 {
    let w = 2.0 * std::f64::consts::PI * frequency / sample_rate;
    let (cos1, sin1) = (w.cos(), w.sin());
    let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());

    let b0 = coefficients.b0 as f64;
    let b1 = coefficients.b1 as f64;
    let b2 = coefficients.b2 as f64;
    let a1 = coefficients.a1 as f64;
    let a2 = coefficients.a2 as f64;

    let num_re = b0 + b1 * cos1 + b2 * cos2;
    let num_im = -(b1 * sin1 + b2 * sin2);
    let den_re = 1.0 + a1 * cos1 + a2 * cos2;
    let den_im = -(a1 * sin1 + a2 * sin2);

    ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
}

/// Product of every active slot's gain at `frequency`
///
/// Bypassed slots contribute exactly 1.
pub fn chain_magnitude_at(snapshot: &ChainSnapshot, frequency: f64, sample_rate: f64) -> f64 {
    snapshot
        .stages
        .iter()
        .filter(|(_, bypassed)| !bypassed)
        .map(|(coefficients, _)| magnitude_at(coefficients, frequency, sample_rate))
        .product()
}

/// Frequency of sample point `index` out of `points`, log-spaced from 20 Hz
pub fn frequency_for_point(index: usize, points: usize) -> f64 {
    map_to_log10(
        index as f64 / points as f64,
        MIN_FREQUENCY as f64,
        MAX_FREQUENCY as f64,
    )
}

/// Combined response in dB at `points` log-spaced frequencies
pub fn evaluate_response(snapshot: &ChainSnapshot, points: usize, sample_rate: f64) -> Vec<f64> {
    (0..points)
        .map(|i| {
            let gain = chain_magnitude_at(snapshot, frequency_for_point(i, points), sample_rate);
            gain_to_db(gain, RESPONSE_FLOOR_DB)
        })
        .collect()
}

/// Map a response onto the plot: one point per pixel column, ±24 dB tall
pub fn response_path(magnitudes_db: &[f64], bounds: PlotBounds) -> RenderPath {
    let top = bounds.top() as f64;
    let bottom = bounds.bottom() as f64;

    let points = magnitudes_db
        .iter()
        .enumerate()
        .map(|(i, &db)| Point {
            x: bounds.x + i as f32,
            y: remap(db, -RESPONSE_RANGE_DB, RESPONSE_RANGE_DB, bottom, top)
                .max(top)
                .min(bottom) as f32,
        })
        .collect();

    RenderPath::from_points(points)
}
