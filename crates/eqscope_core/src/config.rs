//! Engine and Stream Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use eqscope_dsp::{FftOrder, PlotBounds, WindowKind, DEFAULT_NEGATIVE_INFINITY_DB};

use crate::error::{EngineError, EngineResult};
use crate::fifo::DEFAULT_FIFO_SLOTS;

/// Audio stream configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Largest block the host will hand to the processor, in frames
    pub max_block_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            max_block_size: 512,
        }
    }
}

impl StreamConfig {
    /// Calculate latency in milliseconds for one full block
    pub fn latency_ms(&self) -> f32 {
        (self.max_block_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if self.max_block_size < 16 || self.max_block_size > 8192 {
            return Err(format!("Invalid block size: {}", self.max_block_size));
        }
        Ok(())
    }
}

/// Where the analyzer taps the signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzerTap {
    /// Input as received from the host, before filtering
    PreFilter,
    /// Output of the filter chain
    #[default]
    PostFilter,
}

/// Overall engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stream configuration
    pub stream: StreamConfig,

    /// Number of blocks the audio fifo can hold before overwriting the oldest
    pub fifo_slots: usize,

    /// Transform size of the spectrum generators
    pub fft_order: FftOrder,

    /// Analysis window applied before every transform
    pub window: WindowKind,

    /// Bottom of the spectrum plot in dB; quieter bins are clamped here
    pub negative_infinity_db: f32,

    /// Analysis ticks per second
    pub refresh_hz: u32,

    pub analyzer_tap: AnalyzerTap,

    /// Pixel rectangle the paths are generated for
    pub plot: PlotBounds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            fifo_slots: DEFAULT_FIFO_SLOTS,
            fft_order: FftOrder::default(),
            window: WindowKind::default(),
            negative_infinity_db: DEFAULT_NEGATIVE_INFINITY_DB,
            refresh_hz: 60,
            analyzer_tap: AnalyzerTap::default(),
            plot: PlotBounds::default(),
        }
    }
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                channels: 2,
                max_block_size: 128, // ~2.6ms latency
            },
            // Small blocks arrive often; keep roughly the same time span queued
            fifo_slots: 120,
            ..Default::default()
        }
    }

    /// Create config with finer frequency resolution in the analyzer
    pub fn high_resolution() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                channels: 2,
                max_block_size: 1024,
            },
            fft_order: FftOrder::Order8192,
            negative_infinity_db: -72.0,
            ..Default::default()
        }
    }

    /// Parse a JSON document and validate the result
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(EngineError::ConfigError)?;
        Ok(config)
    }

    /// Time between analysis ticks
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.refresh_hz.max(1) as u64)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.stream.validate()?;

        if self.fifo_slots < 2 || self.fifo_slots > 1024 {
            return Err(format!("Invalid fifo slot count: {}", self.fifo_slots));
        }
        if !self.negative_infinity_db.is_finite() || self.negative_infinity_db >= 0.0 {
            return Err(format!(
                "Invalid spectrum floor: {} dB",
                self.negative_infinity_db
            ));
        }
        if self.refresh_hz == 0 || self.refresh_hz > 240 {
            return Err(format!("Invalid refresh rate: {} Hz", self.refresh_hz));
        }
        self.plot.validate().map_err(|e| e.to_string())
    }
}
