//! Per-bin spectral delay lines
//!
//! Every bin of every channel owns a ring buffer of complex values, one slot
//! per FFT hop. Delay granularity is therefore one hop, not one sample.
//!
//! Capacity is fixed at construction. When a bank asks for a longer delay the
//! controller builds a larger set off the audio thread and the engine swaps
//! it in between blocks (see `engine::command`).

use realfft::num_complex::Complex32;

use crate::types::Channel;

const ZERO: Complex32 = Complex32::new(0.0, 0.0);

/// Ring buffers for `num_bins` bins × 2 channels
#[derive(Debug, Clone)]
pub struct BinDelayLines {
    num_bins: usize,
    capacity: usize,
    /// Per channel: `num_bins` consecutive rings of `capacity` slots
    slots: [Vec<Complex32>; 2],
    /// Per channel, per bin write cursor
    cursors: [Vec<usize>; 2],
}

impl BinDelayLines {
    /// Allocate lines holding up to `capacity - 1` frames of delay
    pub fn new(num_bins: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            num_bins,
            capacity,
            slots: std::array::from_fn(|_| vec![ZERO; num_bins * capacity]),
            cursors: std::array::from_fn(|_| vec![0; num_bins]),
        }
    }

    /// Slots per ring (maximum delay is one less)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Longest delay these lines can produce, in frames
    #[inline]
    pub fn max_delay_frames(&self) -> usize {
        self.capacity - 1
    }

    /// Push one frame's value for a bin and return the delayed value
    ///
    /// A zero delay passes `value` straight through without touching the
    /// ring. Delays beyond the capacity are clamped to the longest available.
    #[inline]
    pub fn process(
        &mut self,
        channel: Channel,
        bin: usize,
        delay_frames: usize,
        value: Complex32,
    ) -> Complex32 {
        let delay = delay_frames.min(self.max_delay_frames());
        if delay == 0 || bin >= self.num_bins {
            return value;
        }
        let c = channel.index();
        let base = bin * self.capacity;
        let write = self.cursors[c][bin];
        self.slots[c][base + write] = value;
        let read = (write + self.capacity - delay) % self.capacity;
        self.cursors[c][bin] = (write + 1) % self.capacity;
        self.slots[c][base + read]
    }

    /// Silence every ring and rewind the cursors
    pub fn clear(&mut self) {
        for ch in 0..2 {
            self.slots[ch].fill(ZERO);
            self.cursors[ch].fill(0);
        }
    }
}
