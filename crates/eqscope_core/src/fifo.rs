//! Audio Fifo - lock-free block queue from the audio thread to the analyzer
//!
//! A single-producer/single-consumer ring of fixed-size slots. The producer
//! never waits: when every slot holds an unread block it overwrites the
//! oldest one. The consumer detects overwritten or half-written slots through
//! a per-slot sequence stamp and skips them.
//!
//! # Slot protocol
//!
//! Block number `n` lives in slot `n % slot_count`. Its stamp is `2n + 1`
//! while the producer writes and `2n + 2` once the block is complete. The
//! consumer copies a slot out only if the stamp reads `2n + 2` both before
//! and after the copy (a sequence lock), so it never returns a torn block.
//!
//! Samples are stored as `AtomicU32` f32 bit patterns, which keeps the whole
//! queue in safe Rust.

use std::sync::atomic::{fence, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use eqscope_dsp::DspError;

/// Slot count used when the configuration does not say otherwise
pub const DEFAULT_FIFO_SLOTS: usize = 30;

struct Slot {
    stamp: AtomicU64,
    frames: AtomicUsize,
    /// Planar: channel `c` occupies `[c * capacity, (c + 1) * capacity)`
    samples: Box<[AtomicU32]>,
}

impl Slot {
    fn new(channels: usize, block_capacity: usize) -> Self {
        Self {
            stamp: AtomicU64::new(0),
            frames: AtomicUsize::new(0),
            samples: (0..channels * block_capacity)
                .map(|_| AtomicU32::new(0.0_f32.to_bits()))
                .collect(),
        }
    }
}

struct Shared {
    slots: Box<[Slot]>,
    channels: usize,
    block_capacity: usize,
    /// Number of blocks fully written so far
    published: AtomicU64,
    /// Blocks the consumer never saw because the producer lapped it
    dropped: AtomicU64,
}

impl Shared {
    fn slot(&self, sequence: u64) -> &Slot {
        &self.slots[(sequence % self.slots.len() as u64) as usize]
    }
}

/// Constructor for a producer/consumer pair
pub struct AudioFifo;

impl AudioFifo {
    /// Allocate every slot up front and split into the two halves
    ///
    /// Zero values are raised to one so the queue is always usable.
    pub fn prepare(channels: usize, block_capacity: usize, slot_count: usize) -> (FifoProducer, FifoConsumer) {
        let channels = channels.max(1);
        let block_capacity = block_capacity.max(1);
        let slot_count = slot_count.max(1);

        let shared = Arc::new(Shared {
            slots: (0..slot_count)
                .map(|_| Slot::new(channels, block_capacity))
                .collect(),
            channels,
            block_capacity,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });

        (
            FifoProducer {
                shared: Arc::clone(&shared),
                next: 0,
            },
            FifoConsumer { shared, read: 0 },
        )
    }
}

/// Audio-thread half
///
/// # Real-time Safety
/// `push` never allocates, locks or waits.
pub struct FifoProducer {
    shared: Arc<Shared>,
    next: u64,
}

impl FifoProducer {
    pub fn channels(&self) -> usize {
        self.shared.channels
    }

    pub fn block_capacity(&self) -> usize {
        self.shared.block_capacity
    }

    pub fn slot_count(&self) -> usize {
        self.shared.slots.len()
    }

    /// Copy one planar block into the queue
    ///
    /// Blocks longer than the slot capacity are split into consecutive
    /// capacity-sized blocks. Channels of unequal length are truncated to
    /// the shortest. Returns the number of slots written.
    pub fn push<S: AsRef<[f32]>>(&mut self, channels: &[S]) -> Result<usize, DspError> {
        if channels.len() != self.shared.channels {
            return Err(DspError::ChannelMismatch {
                expected: self.shared.channels,
                got: channels.len(),
            });
        }

        let frames = channels
            .iter()
            .map(|c| c.as_ref().len())
            .min()
            .unwrap_or(0);

        let capacity = self.shared.block_capacity;
        let mut written = 0;
        let mut offset = 0;
        while offset < frames {
            let len = capacity.min(frames - offset);
            self.write_slot(channels, offset, len);
            offset += len;
            written += 1;
        }

        Ok(written)
    }

    fn write_slot<S: AsRef<[f32]>>(&mut self, channels: &[S], offset: usize, len: usize) {
        let shared = &*self.shared;
        let sequence = self.next;
        let slot = shared.slot(sequence);

        slot.stamp.store(2 * sequence + 1, Ordering::Relaxed);
        fence(Ordering::Release);

        slot.frames.store(len, Ordering::Relaxed);
        for (c, channel) in channels.iter().enumerate() {
            let source = &channel.as_ref()[offset..offset + len];
            let base = c * shared.block_capacity;
            for (dest, sample) in slot.samples[base..base + len].iter().zip(source) {
                dest.store(sample.to_bits(), Ordering::Relaxed);
            }
        }

        slot.stamp.store(2 * sequence + 2, Ordering::Release);
        shared.published.store(sequence + 1, Ordering::Release);
        self.next = sequence + 1;
    }
}

/// One block copied out of the queue
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl AudioBlock {
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            channels: vec![vec![0.0; capacity]; channels],
            frames: 0,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Valid samples of one channel
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index][..self.frames]
    }

    fn ensure_shape(&mut self, channels: usize, capacity: usize) {
        self.channels.resize_with(channels, Vec::new);
        for channel in &mut self.channels {
            channel.resize(capacity, 0.0);
        }
    }
}

/// Analysis-thread half
pub struct FifoConsumer {
    shared: Arc<Shared>,
    read: u64,
}

impl FifoConsumer {
    pub fn channels(&self) -> usize {
        self.shared.channels
    }

    pub fn block_capacity(&self) -> usize {
        self.shared.block_capacity
    }

    /// An empty block shaped for this queue
    pub fn make_block(&self) -> AudioBlock {
        AudioBlock::new(self.shared.channels, self.shared.block_capacity)
    }

    /// Complete blocks waiting to be read (approximate while the producer runs)
    pub fn available(&self) -> usize {
        let published = self.shared.published.load(Ordering::Acquire);
        published
            .saturating_sub(self.read)
            .min(self.shared.slots.len() as u64) as usize
    }

    /// Blocks overwritten before the consumer reached them
    pub fn dropped_blocks(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Copy the oldest unread block into `out`
    ///
    /// Returns false when nothing is available. Blocks the producer has
    /// already overwritten are skipped and counted as dropped.
    pub fn pop(&mut self, out: &mut AudioBlock) -> bool {
        let shared = &*self.shared;
        let slot_count = shared.slots.len() as u64;
        out.ensure_shape(shared.channels, shared.block_capacity);

        loop {
            let published = shared.published.load(Ordering::Acquire);
            if self.read >= published {
                return false;
            }

            // Lapped: only the newest `slot_count` blocks can still exist
            if published - self.read > slot_count {
                let skipped = published - slot_count - self.read;
                shared.dropped.fetch_add(skipped, Ordering::Relaxed);
                self.read = published - slot_count;
            }

            let sequence = self.read;
            self.read += 1;

            let slot = shared.slot(sequence);
            let expected = 2 * sequence + 2;
            if slot.stamp.load(Ordering::Acquire) != expected {
                shared.dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let frames = slot.frames.load(Ordering::Relaxed).min(shared.block_capacity);
            for (c, channel) in out.channels.iter_mut().enumerate() {
                let base = c * shared.block_capacity;
                for (dest, sample) in channel[..frames].iter_mut().zip(&slot.samples[base..base + frames]) {
                    *dest = f32::from_bits(sample.load(Ordering::Relaxed));
                }
            }

            fence(Ordering::Acquire);
            if slot.stamp.load(Ordering::Relaxed) != expected {
                // Overwritten mid-copy
                shared.dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            out.frames = frames;
            return true;
        }
    }

    /// Throw away everything currently queued
    pub fn clear(&mut self) -> usize {
        let published = self.shared.published.load(Ordering::Acquire);
        let discarded = self.available();
        self.read = self.read.max(published);
        discarded
    }
}
