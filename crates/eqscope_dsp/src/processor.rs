//! Audio Processor Trait
//!
//! Defines the interface the host-facing engine drives once per audio block.

use crate::chain::StereoChain;

/// Stream shape the host promised at prepare time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessContext {
    pub sample_rate: f64,
    pub channels: usize,
    pub max_block_size: usize,
}

impl ProcessContext {
    pub fn new(sample_rate: f64, channels: usize, max_block_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            max_block_size,
        }
    }
}

/// Anything the audio callback drives once per block
///
/// # Real-time Safety
///
/// `process()` runs on the host's audio thread. It must not allocate, lock,
/// perform I/O or wait, and its cost must be linear in the block length.
/// Breaking any of these shows up as audible dropouts.
pub trait AudioProcessor: Send {
    /// Filter planar channel buffers in place
    fn process(&mut self, channels: &mut [&mut [f32]], context: &ProcessContext);

    /// Clear filter memory, e.g. after a stream restart
    fn reset(&mut self);

    /// Display name for logs
    fn name(&self) -> &'static str;
}

impl AudioProcessor for StereoChain {
    /// Channels beyond the second pass through untouched; a mono buffer is
    /// filtered by the left chain.
    fn process(&mut self, channels: &mut [&mut [f32]], _context: &ProcessContext) {
        match channels {
            [] => {}
            [mono] => self.left_mut().process(mono),
            [left, right, ..] => self.process_planar(left, right),
        }
    }

    fn reset(&mut self) {
        StereoChain::reset(self);
    }

    fn name(&self) -> &'static str {
        "Low-Cut / Peak / High-Cut"
    }
}
