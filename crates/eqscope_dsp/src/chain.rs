//! Low-Cut / Peak / High-Cut Filter Chain
//!
//! Fixed topology of nine biquad slots per channel:
//!
//! ```text
//! LowCut0 → LowCut1 → LowCut2 → LowCut3 → Peak → HighCut0 → HighCut1 → HighCut2 → HighCut3
//! ```
//!
//! Coefficients and bypass flags live in [`ChainControls`], which both channel
//! chains share. The control side swaps in new immutable coefficient handles;
//! the audio side picks them up at the start of every block without locking.
//! Filter delay state belongs to each [`FilterChain`] and is never touched by
//! a coefficient swap or a bypass toggle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use biquad::{Biquad, Coefficients, DirectForm2Transposed};

use crate::coefficients::{make_high_cut_filter, make_low_cut_filter, make_peak_filter};
use crate::error::DspError;
use crate::settings::{ChainSettings, MAX_CUT_STAGES};

/// Number of biquad slots in every chain
pub const NUM_STAGES: usize = 2 * MAX_CUT_STAGES + 1;

/// Slot address inside the chain, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagePosition {
    LowCut0,
    LowCut1,
    LowCut2,
    LowCut3,
    Peak,
    HighCut0,
    HighCut1,
    HighCut2,
    HighCut3,
}

impl StagePosition {
    pub const ALL: [StagePosition; NUM_STAGES] = [
        StagePosition::LowCut0,
        StagePosition::LowCut1,
        StagePosition::LowCut2,
        StagePosition::LowCut3,
        StagePosition::Peak,
        StagePosition::HighCut0,
        StagePosition::HighCut1,
        StagePosition::HighCut2,
        StagePosition::HighCut3,
    ];

    pub const LOW_CUT: [StagePosition; MAX_CUT_STAGES] = [
        StagePosition::LowCut0,
        StagePosition::LowCut1,
        StagePosition::LowCut2,
        StagePosition::LowCut3,
    ];

    pub const HIGH_CUT: [StagePosition; MAX_CUT_STAGES] = [
        StagePosition::HighCut0,
        StagePosition::HighCut1,
        StagePosition::HighCut2,
        StagePosition::HighCut3,
    ];

    /// Index into the slot array
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Pass-through coefficients (y = x) used before the first update
fn identity() -> Coefficients<f32> {
    Coefficients {
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    }
}

/// Coefficient handle and bypass flag for one slot
struct StageControl {
    coefficients: ArcSwap<Coefficients<f32>>,
    bypassed: AtomicBool,
}

impl StageControl {
    fn new() -> Self {
        Self {
            coefficients: ArcSwap::from_pointee(identity()),
            bypassed: AtomicBool::new(false),
        }
    }
}

/// Read-only copy of every slot's coefficients and bypass flag
#[derive(Debug, Clone, Copy)]
pub struct ChainSnapshot {
    pub stages: [(Coefficients<f32>, bool); NUM_STAGES],
}

impl ChainSnapshot {
    pub fn coefficients(&self, stage: StagePosition) -> &Coefficients<f32> {
        &self.stages[stage.index()].0
    }

    pub fn is_bypassed(&self, stage: StagePosition) -> bool {
        self.stages[stage.index()].1
    }
}

/// Shared, thread-safe coefficient store for a set of channel chains
///
/// Written from the control/analysis side, read from the audio thread.
/// Every write is a single atomic store; readers never see a torn update.
pub struct ChainControls {
    stages: [StageControl; NUM_STAGES],
}

impl ChainControls {
    /// All slots start as active pass-throughs
    pub fn new() -> Self {
        Self {
            stages: core::array::from_fn(|_| StageControl::new()),
        }
    }

    /// Replace a slot's coefficients with a new immutable handle
    pub fn set_coefficients(&self, stage: StagePosition, coefficients: Coefficients<f32>) {
        self.stages[stage.index()]
            .coefficients
            .store(Arc::new(coefficients));
    }

    /// Current coefficient handle for a slot
    pub fn coefficients(&self, stage: StagePosition) -> Arc<Coefficients<f32>> {
        self.stages[stage.index()].coefficients.load_full()
    }

    /// Toggle a slot between filtering and identity pass-through
    pub fn set_bypassed(&self, stage: StagePosition, bypassed: bool) {
        self.stages[stage.index()]
            .bypassed
            .store(bypassed, Ordering::Release);
    }

    pub fn is_bypassed(&self, stage: StagePosition) -> bool {
        self.stages[stage.index()].bypassed.load(Ordering::Acquire)
    }

    /// Number of non-bypassed slots among `stages`
    pub fn active_count(&self, stages: &[StagePosition]) -> usize {
        stages.iter().filter(|s| !self.is_bypassed(**s)).count()
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            stages: core::array::from_fn(|i| {
                let stage = StagePosition::ALL[i];
                (*self.coefficients(stage), self.is_bypassed(stage))
            }),
        }
    }

    /// Recompute every slot from a settings snapshot and publish the result
    ///
    /// Call from the control side, never from the audio callback (allocates).
    /// All coefficients are designed before anything is published, so a
    /// design error leaves the chain untouched.
    ///
    /// Cut slots beyond the slope's stage count are bypassed but keep their
    /// previous coefficients and delay state.
    pub fn update_filters(&self, settings: &ChainSettings, sample_rate: f64) -> Result<(), DspError> {
        let peak = make_peak_filter(settings, sample_rate)?;
        let low_cut = make_low_cut_filter(settings, sample_rate)?;
        let high_cut = make_high_cut_filter(settings, sample_rate)?;

        self.set_coefficients(StagePosition::Peak, peak);
        self.set_bypassed(StagePosition::Peak, settings.peak_bypassed);

        self.update_cut(&StagePosition::LOW_CUT, low_cut.stages(), settings.low_cut_bypassed);
        self.update_cut(&StagePosition::HIGH_CUT, high_cut.stages(), settings.high_cut_bypassed);

        Ok(())
    }

    fn update_cut(
        &self,
        positions: &[StagePosition; MAX_CUT_STAGES],
        cascade: &[Coefficients<f32>],
        band_bypassed: bool,
    ) {
        for (i, stage) in positions.iter().enumerate() {
            match cascade.get(i) {
                Some(coefficients) => {
                    self.set_coefficients(*stage, *coefficients);
                    self.set_bypassed(*stage, band_bypassed);
                }
                None => self.set_bypassed(*stage, true),
            }
        }
    }
}

impl Default for ChainControls {
    fn default() -> Self {
        Self::new()
    }
}

/// One channel's cascade of nine biquads
///
/// Holds the filter state and processes audio samples.
/// Designed for real-time use: no allocations, no locks in `process()`.
pub struct FilterChain {
    // DirectForm2Transposed: better numerical stability than DF1
    filters: [DirectForm2Transposed<f32>; NUM_STAGES],
    controls: Arc<ChainControls>,
}

impl FilterChain {
    pub fn new(controls: Arc<ChainControls>) -> Self {
        let filters = core::array::from_fn(|i| {
            DirectForm2Transposed::<f32>::new(*controls.coefficients(StagePosition::ALL[i]))
        });

        Self { filters, controls }
    }

    pub fn controls(&self) -> &Arc<ChainControls> {
        &self.controls
    }

    /// Run every active slot over `block` in place, in chain order
    ///
    /// # Real-time Safety
    /// No allocations, no syscalls, no locks.
    /// O(block length × active slots).
    #[inline]
    pub fn process(&mut self, block: &mut [f32]) {
        for (stage, filter) in StagePosition::ALL.iter().zip(self.filters.iter_mut()) {
            if self.controls.is_bypassed(*stage) {
                continue;
            }

            // update_coefficients leaves the delay line alone
            let coefficients = self.controls.stages[stage.index()].coefficients.load();
            filter.update_coefficients(**coefficients);

            for sample in block.iter_mut() {
                *sample = filter.run(*sample);
            }
        }
    }

    /// Clear every slot's delay line
    ///
    /// Call when the audio stream restarts, not on bypass changes.
    pub fn reset(&mut self) {
        for filter in self.filters.iter_mut() {
            filter.reset_state();
        }
    }
}

/// Left/right chains driven by one shared set of coefficients
pub struct StereoChain {
    left: FilterChain,
    right: FilterChain,
    controls: Arc<ChainControls>,
    sample_rate: f64,
}

impl StereoChain {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_controls(Arc::new(ChainControls::new()), sample_rate)
    }

    pub fn with_controls(controls: Arc<ChainControls>, sample_rate: f64) -> Self {
        Self {
            left: FilterChain::new(Arc::clone(&controls)),
            right: FilterChain::new(Arc::clone(&controls)),
            controls,
            sample_rate,
        }
    }

    pub fn controls(&self) -> &Arc<ChainControls> {
        &self.controls
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn left_mut(&mut self) -> &mut FilterChain {
        &mut self.left
    }

    pub fn right_mut(&mut self) -> &mut FilterChain {
        &mut self.right
    }

    /// Recalculate and publish coefficients for both channels
    pub fn update_filters(&self, settings: &ChainSettings) -> Result<(), DspError> {
        self.controls.update_filters(settings, self.sample_rate)
    }

    /// Process separate left/right channel buffers
    ///
    /// # Panics
    /// Panics if buffers have different lengths (debug builds only)
    #[inline]
    pub fn process_planar(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len(), "Channel buffers must be same length");

        self.left.process(left);
        self.right.process(right);
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::coefficient_bits;
    use crate::settings::Slope;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin() * 0.5)
            .collect()
    }

    fn peak_abs(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_stage_order() {
        for (i, stage) in StagePosition::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert_eq!(StagePosition::Peak.index(), 4);
        assert_eq!(NUM_STAGES, 9);
    }

    #[test]
    fn test_new_chain_is_passthrough() {
        let mut chain = FilterChain::new(Arc::new(ChainControls::new()));
        let mut block = vec![0.5, -0.25, 0.125, 1.0];
        chain.process(&mut block);
        assert_eq!(block, vec![0.5, -0.25, 0.125, 1.0]);
    }

    #[test]
    fn test_slope_controls_active_stage_count() {
        let controls = ChainControls::new();
        for low in Slope::ALL {
            for high in Slope::ALL {
                let settings = ChainSettings {
                    low_cut_slope: low,
                    high_cut_slope: high,
                    ..Default::default()
                };
                controls.update_filters(&settings, 48000.0).unwrap();
                assert_eq!(controls.active_count(&StagePosition::LOW_CUT), low.stage_count());
                assert_eq!(controls.active_count(&StagePosition::HIGH_CUT), high.stage_count());

                // Active stages are always the leading ones
                for (i, stage) in StagePosition::LOW_CUT.iter().enumerate() {
                    assert_eq!(controls.is_bypassed(*stage), i >= low.stage_count());
                }
            }
        }
    }

    #[test]
    fn test_slope_change_toggles_only_the_difference() {
        let controls = ChainControls::new();
        for from in Slope::ALL {
            for to in Slope::ALL {
                let before = ChainSettings {
                    low_cut_slope: from,
                    ..Default::default()
                };
                controls.update_filters(&before, 48000.0).unwrap();
                let flags_before: Vec<bool> = StagePosition::LOW_CUT
                    .iter()
                    .map(|s| controls.is_bypassed(*s))
                    .collect();

                let after = ChainSettings {
                    low_cut_slope: to,
                    ..Default::default()
                };
                controls.update_filters(&after, 48000.0).unwrap();
                let changed = StagePosition::LOW_CUT
                    .iter()
                    .zip(&flags_before)
                    .filter(|(s, was)| controls.is_bypassed(**s) != **was)
                    .count();

                assert_eq!(changed, from.stage_count().abs_diff(to.stage_count()));
            }
        }
    }

    #[test]
    fn test_band_bypass_covers_all_cut_stages() {
        let controls = ChainControls::new();
        let settings = ChainSettings {
            low_cut_slope: Slope::Db48,
            low_cut_bypassed: true,
            peak_bypassed: true,
            ..Default::default()
        };
        controls.update_filters(&settings, 48000.0).unwrap();

        assert_eq!(controls.active_count(&StagePosition::LOW_CUT), 0);
        assert!(controls.is_bypassed(StagePosition::Peak));
        assert_eq!(controls.active_count(&StagePosition::HIGH_CUT), 1);
    }

    #[test]
    fn test_inactive_stages_keep_stale_coefficients() {
        let controls = ChainControls::new();
        let steep = ChainSettings {
            low_cut_freq: 200.0,
            low_cut_slope: Slope::Db48,
            ..Default::default()
        };
        controls.update_filters(&steep, 48000.0).unwrap();
        let stale = *controls.coefficients(StagePosition::LowCut3);

        let gentle = ChainSettings {
            low_cut_freq: 80.0,
            low_cut_slope: Slope::Db12,
            ..Default::default()
        };
        controls.update_filters(&gentle, 48000.0).unwrap();

        assert!(controls.is_bypassed(StagePosition::LowCut3));
        assert_eq!(
            coefficient_bits(&controls.coefficients(StagePosition::LowCut3)),
            coefficient_bits(&stale)
        );
    }

    #[test]
    fn test_update_is_idempotent() {
        let controls = ChainControls::new();
        let settings = ChainSettings {
            low_cut_freq: 120.0,
            peak_freq: 2500.0,
            peak_gain_db: 4.5,
            low_cut_slope: Slope::Db24,
            high_cut_slope: Slope::Db36,
            high_cut_freq: 12000.0,
            ..Default::default()
        };

        controls.update_filters(&settings, 44100.0).unwrap();
        let first = controls.snapshot();
        controls.update_filters(&settings, 44100.0).unwrap();
        let second = controls.snapshot();

        for (a, b) in first.stages.iter().zip(second.stages.iter()) {
            assert_eq!(coefficient_bits(&a.0), coefficient_bits(&b.0));
            assert_eq!(a.1, b.1);
        }
    }

    #[test]
    fn test_failed_update_leaves_chain_untouched() {
        let controls = ChainControls::new();
        controls
            .update_filters(&ChainSettings::default(), 48000.0)
            .unwrap();
        let before = controls.snapshot();

        let broken = ChainSettings {
            high_cut_freq: 40000.0,
            peak_gain_db: 12.0,
            ..Default::default()
        };
        assert!(controls.update_filters(&broken, 48000.0).is_err());

        let after = controls.snapshot();
        for (a, b) in before.stages.iter().zip(after.stages.iter()) {
            assert_eq!(coefficient_bits(&a.0), coefficient_bits(&b.0));
        }
    }

    #[test]
    fn test_bypassed_stage_is_identity() {
        let controls = Arc::new(ChainControls::new());
        let settings = ChainSettings {
            peak_gain_db: 12.0,
            low_cut_bypassed: true,
            peak_bypassed: true,
            high_cut_bypassed: true,
            ..Default::default()
        };
        controls.update_filters(&settings, 48000.0).unwrap();

        let mut chain = FilterChain::new(Arc::clone(&controls));
        let input = sine(750.0, 48000.0, 256);
        let mut block = input.clone();
        chain.process(&mut block);
        assert_eq!(block, input);
    }

    #[test]
    fn test_boost_increases_amplitude() {
        let mut stereo = StereoChain::new(48000.0);
        stereo
            .update_filters(&ChainSettings {
                peak_freq: 1000.0,
                peak_gain_db: 12.0,
                ..Default::default()
            })
            .unwrap();

        let input = sine(1000.0, 48000.0, 4800);
        let mut left = input.clone();
        let mut right = input.clone();
        stereo.process_planar(&mut left, &mut right);

        // Skip the settling period
        assert!(peak_abs(&left[2400..]) > peak_abs(&input) * 3.0);
        assert_eq!(left, right);
    }

    #[test]
    fn test_low_cut_attenuates_rumble() {
        let controls = Arc::new(ChainControls::new());
        controls
            .update_filters(
                &ChainSettings {
                    low_cut_freq: 500.0,
                    low_cut_slope: Slope::Db48,
                    ..Default::default()
                },
                48000.0,
            )
            .unwrap();
        let mut chain = FilterChain::new(controls);

        let mut block = sine(50.0, 48000.0, 48000);
        chain.process(&mut block);
        assert!(peak_abs(&block[24000..]) < 0.001);
    }

    #[test]
    fn test_coefficient_swap_keeps_state() {
        let controls = Arc::new(ChainControls::new());
        controls
            .update_filters(&ChainSettings::default(), 48000.0)
            .unwrap();
        let mut chain = FilterChain::new(Arc::clone(&controls));

        let mut block = vec![1.0_f32; 64];
        chain.process(&mut block);

        // Republishing identical coefficients must continue the same signal
        let mut reference = FilterChain::new(Arc::new(ChainControls::new()));
        reference
            .controls()
            .update_filters(&ChainSettings::default(), 48000.0)
            .unwrap();
        let mut expected = vec![1.0_f32; 128];
        reference.process(&mut expected);

        controls
            .update_filters(&ChainSettings::default(), 48000.0)
            .unwrap();
        let mut next = vec![1.0_f32; 64];
        chain.process(&mut next);

        assert_eq!(&block[..], &expected[..64]);
        assert_eq!(&next[..], &expected[64..]);
    }

    #[test]
    fn test_reset_clears_state() {
        let controls = Arc::new(ChainControls::new());
        controls
            .update_filters(
                &ChainSettings {
                    peak_gain_db: 9.0,
                    ..Default::default()
                },
                48000.0,
            )
            .unwrap();
        let mut chain = FilterChain::new(controls);

        let mut first = sine(440.0, 48000.0, 128);
        let original = first.clone();
        chain.process(&mut first);
        chain.reset();
        let mut second = original;
        chain.process(&mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn test_sample_rate_stored() {
        let stereo = StereoChain::new(44100.0);
        assert_eq!(stereo.sample_rate(), 44100.0);
    }

    #[test]
    fn test_update_from_another_thread_while_processing() {
        let controls = Arc::new(ChainControls::new());
        let mut chain = FilterChain::new(Arc::clone(&controls));

        let boosted = ChainSettings {
            peak_gain_db: 12.0,
            low_cut_slope: Slope::Db48,
            ..Default::default()
        };
        let cut = ChainSettings {
            peak_gain_db: -12.0,
            low_cut_freq: 200.0,
            high_cut_slope: Slope::Db36,
            ..Default::default()
        };

        let writer_controls = Arc::clone(&controls);
        let writer = std::thread::spawn(move || {
            for i in 0..2000 {
                let settings = if i % 2 == 0 { boosted } else { cut };
                writer_controls.update_filters(&settings, 48000.0).unwrap();
            }
            writer_controls.update_filters(&boosted, 48000.0).unwrap();
        });

        let input = sine(750.0, 48000.0, 256);
        while !writer.is_finished() {
            let mut block = input.clone();
            chain.process(&mut block);
            assert!(block.iter().all(|s| s.is_finite() && s.abs() < 100.0));
        }
        writer.join().unwrap();

        let reference = ChainControls::new();
        reference.update_filters(&boosted, 48000.0).unwrap();
        for stage in StagePosition::ALL {
            assert_eq!(
                coefficient_bits(&controls.coefficients(stage)),
                coefficient_bits(&reference.coefficients(stage))
            );
            assert_eq!(controls.is_bypassed(stage), reference.is_bypassed(stage));
        }
    }
}
