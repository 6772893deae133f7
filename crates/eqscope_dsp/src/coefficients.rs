//! Coefficient Factory
//!
//! Pure functions that turn a [`ChainSettings`] snapshot into biquad
//! coefficients. Based on the RBJ (Robert Bristow-Johnson) Audio EQ Cookbook
//! for the peak band, and Butterworth pole placement for the cut cascades.
//!
//! Designs are computed in `f64` and narrowed to `f32` once, so the same
//! inputs always yield bit-identical coefficients.

use biquad::{Coefficients, ToHertz, Type};

use crate::error::DspError;
use crate::settings::{ChainSettings, Slope, MAX_CUT_STAGES};

/// Convert dB gain to linear amplitude
/// Formula: amplitude = 10^(dB/20)
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to dB, never going below `floor_db`
pub fn gain_to_db(gain: f64, floor_db: f64) -> f64 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(floor_db)
    } else {
        floor_db
    }
}

/// Q of one 2nd-order section inside a Butterworth filter of even `order`
///
/// Section `k` pairs the conjugate poles at angle `(2k+1)π / 2N`.
pub fn butterworth_q(order: usize, section: usize) -> f64 {
    let angle = (2 * section + 1) as f64 * std::f64::consts::PI / (2 * order) as f64;
    1.0 / (2.0 * angle.cos())
}

/// Ordered biquad sections of a low-cut or high-cut filter
///
/// Holds exactly `slope.stage_count()` sections; their product is a
/// Butterworth response of order `2 × stage_count`.
#[derive(Debug, Clone)]
pub struct CutCascade {
    stages: Vec<Coefficients<f32>>,
}

impl CutCascade {
    pub fn stages(&self) -> &[Coefficients<f32>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Which way a cut cascade rolls off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CutKind {
    LowCut,
    HighCut,
}

fn narrow(coeffs: Coefficients<f64>) -> Coefficients<f32> {
    Coefficients {
        a1: coeffs.a1 as f32,
        a2: coeffs.a2 as f32,
        b0: coeffs.b0 as f32,
        b1: coeffs.b1 as f32,
        b2: coeffs.b2 as f32,
    }
}

fn design(
    filter: Type<f64>,
    frequency: f32,
    q: f64,
    sample_rate: f64,
) -> Result<Coefficients<f32>, DspError> {
    if sample_rate <= 0.0 || !sample_rate.is_finite() {
        return Err(DspError::InvalidSampleRate(sample_rate as f32));
    }

    Coefficients::<f64>::from_params(filter, sample_rate.hz(), (frequency as f64).hz(), q)
        .map(narrow)
        .map_err(|_| DspError::InvalidCoefficients {
            frequency,
            sample_rate: sample_rate as f32,
        })
}

/// Peak (bell) coefficients for the middle band
pub fn make_peak_filter(
    settings: &ChainSettings,
    sample_rate: f64,
) -> Result<Coefficients<f32>, DspError> {
    // biquad takes the bell gain in dB; the cookbook's A = sqrt(10^(dB/20))
    design(
        Type::PeakingEQ(settings.peak_gain_db as f64),
        settings.peak_freq,
        settings.peak_quality as f64,
        sample_rate,
    )
}

fn make_cut_filter(
    kind: CutKind,
    frequency: f32,
    slope: Slope,
    sample_rate: f64,
) -> Result<CutCascade, DspError> {
    let order = slope.order();
    let mut stages = Vec::with_capacity(MAX_CUT_STAGES);

    for section in 0..slope.stage_count() {
        let filter = match kind {
            CutKind::LowCut => Type::HighPass,
            CutKind::HighCut => Type::LowPass,
        };
        stages.push(design(
            filter,
            frequency,
            butterworth_q(order, section),
            sample_rate,
        )?);
    }

    Ok(CutCascade { stages })
}

/// High-pass cascade removing content below `low_cut_freq`
pub fn make_low_cut_filter(
    settings: &ChainSettings,
    sample_rate: f64,
) -> Result<CutCascade, DspError> {
    make_cut_filter(
        CutKind::LowCut,
        settings.low_cut_freq,
        settings.low_cut_slope,
        sample_rate,
    )
}

/// Low-pass cascade removing content above `high_cut_freq`
pub fn make_high_cut_filter(
    settings: &ChainSettings,
    sample_rate: f64,
) -> Result<CutCascade, DspError> {
    make_cut_filter(
        CutKind::HighCut,
        settings.high_cut_freq,
        settings.high_cut_slope,
        sample_rate,
    )
}

#[cfg(test)]
pub(crate) fn coefficient_bits(c: &Coefficients<f32>) -> [u32; 5] {
    [
        c.a1.to_bits(),
        c.a2.to_bits(),
        c.b0.to_bits(),
        c.b1.to_bits(),
        c.b2.to_bits(),
    ]
}
