//! FFT Spectrum Generator
//!
//! Turns a rolling history of raw samples into decibel-magnitude frames for
//! the analyzer overlay.
//!
//! # Architecture
//!
//! The generator lives on the analysis thread. Every incoming block shifts
//! the history left by the block length and appends the new samples, then
//! one windowed transform of the whole history produces a frame. Frames wait
//! in a short queue until the path generator pulls them; under backlog the
//! oldest frames are dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::coefficients::gain_to_db;

/// Frames kept before the oldest is discarded
pub const DEFAULT_FRAME_BACKLOG: usize = 30;

/// Floor used for silent bins when the caller has no preference
pub const DEFAULT_NEGATIVE_INFINITY_DB: f32 = -48.0;

/// Transform size, fixed for the lifetime of a generator
///
/// 2048 samples at 48kHz = ~42ms window, ~23Hz resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FftOrder {
    #[default]
    Order2048,
    Order4096,
    Order8192,
}

impl FftOrder {
    pub fn fft_size(self) -> usize {
        match self {
            FftOrder::Order2048 => 2048,
            FftOrder::Order4096 => 4096,
            FftOrder::Order8192 => 8192,
        }
    }
}

/// Window applied before the transform to reduce spectral leakage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowKind {
    Hann,
    #[default]
    BlackmanHarris,
}

impl WindowKind {
    fn coefficient(self, n: usize, size: usize) -> f32 {
        let phase = 2.0 * std::f64::consts::PI * n as f64 / (size - 1) as f64;
        let value = match self {
            WindowKind::Hann => 0.5 * (1.0 - phase.cos()),
            WindowKind::BlackmanHarris => {
                0.35875 - 0.48829 * phase.cos() + 0.14128 * (2.0 * phase).cos()
                    - 0.01168 * (3.0 * phase).cos()
            }
        };
        value as f32
    }

    /// Pre-computed window lookup table
    fn table(self, size: usize) -> Vec<f32> {
        (0..size).map(|n| self.coefficient(n, size)).collect()
    }
}

/// One transformed window: per-bin magnitude in dB, DC first
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    magnitudes_db: Vec<f32>,
    sample_rate: f32,
}

impl SpectrumFrame {
    pub fn new(magnitudes_db: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            magnitudes_db,
            sample_rate,
        }
    }

    pub fn magnitudes_db(&self) -> &[f32] {
        &self.magnitudes_db
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Transform size that produced this frame
    pub fn fft_size(&self) -> usize {
        self.magnitudes_db.len() * 2
    }

    /// Width of one bin in Hz
    pub fn bin_width(&self) -> f32 {
        self.sample_rate / self.fft_size() as f32
    }
}

/// Spectrum generator that computes FFT magnitude frames
pub struct SpectrumGenerator {
    fft_size: usize,
    /// Rolling history, oldest sample first
    history: Vec<f32>,
    /// Samples received so far, saturating at `fft_size`
    filled: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    frames: VecDeque<SpectrumFrame>,
    backlog: usize,
}

impl SpectrumGenerator {
    pub fn new(order: FftOrder, window: WindowKind) -> Self {
        let fft_size = order.fft_size();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft_size,
            history: vec![0.0; fft_size],
            filled: 0,
            window: window.table(fft_size),
            fft,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
            frames: VecDeque::with_capacity(DEFAULT_FRAME_BACKLOG),
            backlog: DEFAULT_FRAME_BACKLOG,
        }
    }

    /// Limit the number of queued frames (at least one)
    pub fn with_backlog(mut self, backlog: usize) -> Self {
        self.backlog = backlog.max(1);
        self
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Magnitude bins per frame (positive frequencies, DC included)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Whether a full window of history has been collected
    pub fn is_primed(&self) -> bool {
        self.filled >= self.fft_size
    }

    /// Shift the history left by `block.len()` and append `block`
    pub fn push_samples(&mut self, block: &[f32]) {
        let n = self.fft_size;
        if block.len() >= n {
            self.history.copy_from_slice(&block[block.len() - n..]);
        } else {
            self.history.copy_within(block.len().., 0);
            self.history[n - block.len()..].copy_from_slice(block);
        }
        self.filled = (self.filled + block.len()).min(n);
    }

    /// Transform the current history into a frame and queue it
    ///
    /// Returns false without queuing anything until a full window of history
    /// has arrived.
    pub fn produce_frame(&mut self, sample_rate: f32, negative_infinity_db: f32) -> bool {
        if !self.is_primed() {
            return false;
        }

        for ((slot, sample), w) in self.buffer.iter_mut().zip(&self.history).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let num_bins = self.num_bins();
        let mut magnitudes = self.recycled_frame_buffer();
        magnitudes.extend(self.buffer[..num_bins].iter().map(|c| {
            let normalized = c.norm() as f64 / num_bins as f64;
            gain_to_db(normalized, negative_infinity_db as f64) as f32
        }));

        if self.frames.len() >= self.backlog {
            self.frames.pop_front();
        }
        self.frames.push_back(SpectrumFrame::new(magnitudes, sample_rate));
        true
    }

    /// Append a block and produce a frame from the updated history
    pub fn process_block(&mut self, block: &[f32], sample_rate: f32, negative_infinity_db: f32) -> bool {
        self.push_samples(block);
        self.produce_frame(sample_rate, negative_infinity_db)
    }

    pub fn available_frames(&self) -> usize {
        self.frames.len()
    }

    /// Oldest queued frame
    pub fn pop_frame(&mut self) -> Option<SpectrumFrame> {
        self.frames.pop_front()
    }

    /// Drop history and queued frames
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.filled = 0;
        self.frames.clear();
    }

    fn recycled_frame_buffer(&mut self) -> Vec<f32> {
        // Reuse the allocation of a frame that is about to be evicted
        if self.frames.len() >= self.backlog {
            if let Some(old) = self.frames.pop_front() {
                let mut magnitudes = old.magnitudes_db;
                magnitudes.clear();
                return magnitudes;
            }
        }
        Vec::with_capacity(self.num_bins())
    }
}
