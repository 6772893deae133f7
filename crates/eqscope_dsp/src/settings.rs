//! Chain Settings
//!
//! Immutable snapshot of the user-facing filter parameters. A new snapshot is
//! taken for every update; nothing edits one in place.

use serde::{Deserialize, Serialize};

/// Lowest frequency any band can be set to (Hz)
pub const MIN_FREQUENCY: f32 = 20.0;

/// Highest frequency any band can be set to (Hz)
pub const MAX_FREQUENCY: f32 = 20000.0;

/// Highest designable frequency as a fraction of the sample rate
///
/// Kept just under Nyquist so low sample rates still get a usable high cut.
pub const NYQUIST_LIMIT: f64 = 0.49;

/// Maximum number of biquad sections in a low-cut or high-cut cascade
pub const MAX_CUT_STAGES: usize = 4;

/// Roll-off steepness of a cut filter
///
/// Each step adds one 2nd-order section (12 dB/octave) to the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Slope {
    #[default]
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    pub const ALL: [Slope; 4] = [Slope::Db12, Slope::Db24, Slope::Db36, Slope::Db48];

    /// Number of active biquad sections (1-4)
    pub fn stage_count(self) -> usize {
        match self {
            Slope::Db12 => 1,
            Slope::Db24 => 2,
            Slope::Db36 => 3,
            Slope::Db48 => 4,
        }
    }

    /// Total filter order of the cascade
    pub fn order(self) -> usize {
        self.stage_count() * 2
    }

    /// Attenuation per octave past the cutoff
    pub fn db_per_octave(self) -> u32 {
        12 * self.stage_count() as u32
    }

    /// Build from a choice index as a host stores it (0 = 12 dB/oct).
    /// Out-of-range indices saturate to the nearest valid slope.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn index(self) -> usize {
        self.stage_count() - 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Slope::Db12 => "12 db/Oct",
            Slope::Db24 => "24 db/Oct",
            Slope::Db36 => "36 db/Oct",
            Slope::Db48 => "48 db/Oct",
        }
    }
}

/// Snapshot of every parameter the filter chain depends on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    pub low_cut_freq: f32,
    pub high_cut_freq: f32,
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_quality: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
    pub low_cut_bypassed: bool,
    pub peak_bypassed: bool,
    pub high_cut_bypassed: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            low_cut_freq: MIN_FREQUENCY,
            high_cut_freq: MAX_FREQUENCY,
            peak_freq: 750.0,
            peak_gain_db: 0.0,
            peak_quality: 1.0,
            low_cut_slope: Slope::Db12,
            high_cut_slope: Slope::Db12,
            low_cut_bypassed: false,
            peak_bypassed: false,
            high_cut_bypassed: false,
        }
    }
}

impl ChainSettings {
    /// Copy with every band frequency pulled below Nyquist for `sample_rate`
    ///
    /// Frequencies already in range are returned bit-for-bit unchanged.
    pub fn limited_to(self, sample_rate: f64) -> Self {
        let limit = (sample_rate * NYQUIST_LIMIT) as f32;
        let cap = |frequency: f32| if frequency > limit { limit } else { frequency };
        Self {
            low_cut_freq: cap(self.low_cut_freq),
            high_cut_freq: cap(self.high_cut_freq),
            peak_freq: cap(self.peak_freq),
            ..self
        }
    }
}
