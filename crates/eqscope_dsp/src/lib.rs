//! eqscope DSP - Digital Signal Processing Module
//!
//! This crate provides the signal pipeline for eqscope, including:
//! - Coefficient factory for the peak bell and Butterworth cut cascades
//! - Nine-slot low-cut / peak / high-cut filter chain using BiQuad filters
//! - FFT spectrum generator for real-time visualization
//! - Spectrum and response-curve render paths
//! - Lock-free coefficient updates for real-time safety
//!
//! # Architecture
//!
//! The DSP chain follows a strict "no allocation in audio callback" rule.
//! Coefficients are designed on the control side and published as immutable
//! handles; the audio thread picks them up between blocks.

mod chain;
mod coefficients;
mod error;
mod path;
mod processor;
mod response;
mod settings;
mod spectrum;

pub use chain::{ChainControls, ChainSnapshot, FilterChain, StagePosition, StereoChain, NUM_STAGES};
pub use coefficients::{
    butterworth_q, db_to_gain, gain_to_db, make_high_cut_filter, make_low_cut_filter,
    make_peak_filter, CutCascade,
};
pub use error::DspError;
pub use path::{
    map_from_log10, map_to_log10, PathGenerator, PlotBounds, Point, RenderPath,
    DEFAULT_PATH_RESOLUTION,
};
pub use processor::{AudioProcessor, ProcessContext};
pub use response::{
    chain_magnitude_at, evaluate_response, frequency_for_point, magnitude_at, response_path,
    RESPONSE_RANGE_DB,
};
pub use settings::{ChainSettings, Slope, MAX_CUT_STAGES, MAX_FREQUENCY, MIN_FREQUENCY, NYQUIST_LIMIT};
pub use spectrum::{
    FftOrder, SpectrumFrame, SpectrumGenerator, WindowKind, DEFAULT_FRAME_BACKLOG,
    DEFAULT_NEGATIVE_INFINITY_DB,
};

/// Re-exported so downstream crates can name coefficient types without a
/// direct biquad dependency
pub use biquad::Coefficients;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify all public types are accessible
        let _settings = ChainSettings::default();
        let _chain = StereoChain::new(48000.0);
        let _generator = SpectrumGenerator::new(FftOrder::default(), WindowKind::default());
    }
}
