//! Parameter Store
//!
//! Lock-free storage for every user-facing control. Any thread may read or
//! write; each write raises a shared dirty flag that the analysis tick
//! consumes with a single compare-and-swap before rebuilding coefficients.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use eqscope_dsp::{ChainSettings, Slope, MAX_FREQUENCY, MIN_FREQUENCY};

/// Number of parameters in the store
pub const PARAMETER_COUNT: usize = 11;

/// Every parameter the store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterId {
    LowCutFreq,
    HighCutFreq,
    PeakFreq,
    PeakGain,
    PeakQuality,
    LowCutSlope,
    HighCutSlope,
    LowCutBypassed,
    PeakBypassed,
    HighCutBypassed,
    AnalyzerEnabled,
}

impl ParameterId {
    pub const ALL: [ParameterId; PARAMETER_COUNT] = [
        ParameterId::LowCutFreq,
        ParameterId::HighCutFreq,
        ParameterId::PeakFreq,
        ParameterId::PeakGain,
        ParameterId::PeakQuality,
        ParameterId::LowCutSlope,
        ParameterId::HighCutSlope,
        ParameterId::LowCutBypassed,
        ParameterId::PeakBypassed,
        ParameterId::HighCutBypassed,
        ParameterId::AnalyzerEnabled,
    ];

    /// Host-visible name
    pub fn name(self) -> &'static str {
        match self {
            ParameterId::LowCutFreq => "LowCut Freq",
            ParameterId::HighCutFreq => "HighCut Freq",
            ParameterId::PeakFreq => "Peak Freq",
            ParameterId::PeakGain => "Peak Gain",
            ParameterId::PeakQuality => "Peak Quality",
            ParameterId::LowCutSlope => "LowCut Slope",
            ParameterId::HighCutSlope => "HighCut Slope",
            ParameterId::LowCutBypassed => "LowCut Bypassed",
            ParameterId::PeakBypassed => "Peak Bypassed",
            ParameterId::HighCutBypassed => "HighCut Bypassed",
            ParameterId::AnalyzerEnabled => "Analyzer Enabled",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    /// Range, step and default value
    pub fn range(self) -> ParameterRange {
        const FREQUENCY_SKEW: f32 = 0.25;
        let slope_max = (Slope::ALL.len() - 1) as f32;

        match self {
            ParameterId::LowCutFreq => ParameterRange::new(MIN_FREQUENCY, MAX_FREQUENCY, 1.0, MIN_FREQUENCY)
                .with_skew(FREQUENCY_SKEW),
            ParameterId::HighCutFreq => ParameterRange::new(MIN_FREQUENCY, MAX_FREQUENCY, 1.0, MAX_FREQUENCY)
                .with_skew(FREQUENCY_SKEW),
            ParameterId::PeakFreq => {
                ParameterRange::new(MIN_FREQUENCY, MAX_FREQUENCY, 1.0, 750.0).with_skew(FREQUENCY_SKEW)
            }
            ParameterId::PeakGain => ParameterRange::new(-24.0, 24.0, 0.5, 0.0),
            ParameterId::PeakQuality => ParameterRange::new(0.1, 10.0, 0.05, 1.0),
            ParameterId::LowCutSlope | ParameterId::HighCutSlope => {
                ParameterRange::new(0.0, slope_max, 1.0, 0.0)
            }
            ParameterId::LowCutBypassed | ParameterId::PeakBypassed | ParameterId::HighCutBypassed => {
                ParameterRange::toggle(false)
            }
            ParameterId::AnalyzerEnabled => ParameterRange::toggle(true),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Bounds, step size and default of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    /// Values snap to `min + k * step`
    pub step: f32,
    pub default: f32,
    /// Exponent of the normalized mapping; < 1 spreads the low end
    pub skew: f32,
}

impl ParameterRange {
    pub fn new(min: f32, max: f32, step: f32, default: f32) -> Self {
        Self {
            min,
            max,
            step,
            default,
            skew: 1.0,
        }
    }

    fn toggle(default: bool) -> Self {
        Self::new(0.0, 1.0, 1.0, if default { 1.0 } else { 0.0 })
    }

    pub fn with_skew(mut self, skew: f32) -> Self {
        self.skew = skew;
        self
    }

    /// Clamp into range and snap to the step grid
    pub fn constrain(&self, value: f32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return clamped;
        }
        // f64 keeps values already on the grid bit-exact after the round trip
        let (min, step) = (self.min as f64, self.step as f64);
        let snapped = min + ((clamped as f64 - min) / step).round() * step;
        (snapped as f32).clamp(self.min, self.max)
    }

    /// Map a value to 0..1, the way a host slider sees it
    pub fn to_normalized(&self, value: f32) -> f32 {
        let proportion = ((self.constrain(value) - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        proportion.powf(self.skew)
    }

    /// Inverse of [`to_normalized`](Self::to_normalized), snapped to the step grid
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let proportion = normalized.clamp(0.0, 1.0).powf(1.0 / self.skew);
        self.constrain(self.min + (self.max - self.min) * proportion)
    }
}

/// Thread-safe parameter values plus a change flag
pub struct ParameterStore {
    /// f32 values stored as bits, indexed by `ParameterId`
    values: [AtomicU32; PARAMETER_COUNT],
    dirty: Arc<AtomicBool>,
}

impl ParameterStore {
    /// All parameters at their defaults, flagged dirty so the first tick
    /// designs the filters
    pub fn new() -> Self {
        Self {
            values: core::array::from_fn(|i| AtomicU32::new(ParameterId::ALL[i].range().default.to_bits())),
            dirty: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Store initialised from a settings snapshot
    pub fn from_settings(settings: &ChainSettings) -> Self {
        let store = Self::new();
        store.apply_settings(settings);
        store
    }

    pub fn get(&self, id: ParameterId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Write a value, clamped and snapped to the parameter's range
    ///
    /// Returns the value actually stored. NaN is ignored. The dirty flag is
    /// raised only when the stored value changes.
    pub fn set(&self, id: ParameterId, value: f32) -> f32 {
        if value.is_nan() {
            return self.get(id);
        }

        let constrained = id.range().constrain(value);
        let previous = self.values[id.index()].swap(constrained.to_bits(), Ordering::Relaxed);
        if previous != constrained.to_bits() {
            self.dirty.store(true, Ordering::Release);
        }
        constrained
    }

    pub fn set_bool(&self, id: ParameterId, value: bool) {
        self.set(id, if value { 1.0 } else { 0.0 });
    }

    pub fn get_bool(&self, id: ParameterId) -> bool {
        self.get(id) >= 0.5
    }

    pub fn range(&self, id: ParameterId) -> ParameterRange {
        id.range()
    }

    /// Restore every parameter to its default
    pub fn reset_to_defaults(&self) {
        for id in ParameterId::ALL {
            self.set(id, id.range().default);
        }
    }

    /// Snapshot of the filter-related parameters
    pub fn chain_settings(&self) -> ChainSettings {
        ChainSettings {
            low_cut_freq: self.get(ParameterId::LowCutFreq),
            high_cut_freq: self.get(ParameterId::HighCutFreq),
            peak_freq: self.get(ParameterId::PeakFreq),
            peak_gain_db: self.get(ParameterId::PeakGain),
            peak_quality: self.get(ParameterId::PeakQuality),
            low_cut_slope: Slope::from_index(self.get(ParameterId::LowCutSlope).round() as usize),
            high_cut_slope: Slope::from_index(self.get(ParameterId::HighCutSlope).round() as usize),
            low_cut_bypassed: self.get_bool(ParameterId::LowCutBypassed),
            peak_bypassed: self.get_bool(ParameterId::PeakBypassed),
            high_cut_bypassed: self.get_bool(ParameterId::HighCutBypassed),
        }
    }

    /// Write every filter-related parameter from a snapshot
    pub fn apply_settings(&self, settings: &ChainSettings) {
        self.set(ParameterId::LowCutFreq, settings.low_cut_freq);
        self.set(ParameterId::HighCutFreq, settings.high_cut_freq);
        self.set(ParameterId::PeakFreq, settings.peak_freq);
        self.set(ParameterId::PeakGain, settings.peak_gain_db);
        self.set(ParameterId::PeakQuality, settings.peak_quality);
        self.set(ParameterId::LowCutSlope, settings.low_cut_slope.index() as f32);
        self.set(ParameterId::HighCutSlope, settings.high_cut_slope.index() as f32);
        self.set_bool(ParameterId::LowCutBypassed, settings.low_cut_bypassed);
        self.set_bool(ParameterId::PeakBypassed, settings.peak_bypassed);
        self.set_bool(ParameterId::HighCutBypassed, settings.high_cut_bypassed);
    }

    pub fn analyzer_enabled(&self) -> bool {
        self.get_bool(ParameterId::AnalyzerEnabled)
    }

    /// Change hook shared with whoever needs to raise or watch it
    pub fn dirty_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.dirty)
    }

    /// Force the next tick to rebuild
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Clear the dirty flag, returning whether it was set
    ///
    /// Exactly one caller observes each raise.
    pub fn take_dirty(&self) -> bool {
        self.dirty
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
