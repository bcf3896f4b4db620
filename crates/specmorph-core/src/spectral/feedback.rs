//! Feedback accumulators carried from one frame to the next

use realfft::num_complex::Complex32;

use crate::types::Channel;

const ZERO: Complex32 = Complex32::new(0.0, 0.0);

/// Per-bin, per-channel complex feedback values
#[derive(Debug, Clone)]
pub struct FeedbackState {
    values: [Vec<Complex32>; 2],
    /// Something non-zero may have been stored since the last clear
    dirty: bool,
}

impl FeedbackState {
    pub fn new(num_bins: usize) -> Self {
        Self {
            values: std::array::from_fn(|_| vec![ZERO; num_bins]),
            dirty: false,
        }
    }

    #[inline]
    pub fn get(&self, channel: Channel, bin: usize) -> Complex32 {
        self.values[channel.index()][bin]
    }

    /// Store next frame's feedback for a bin
    ///
    /// Non-finite values are stored as zero. Returns true if the value had to
    /// be sanitized.
    #[inline]
    pub fn store(&mut self, channel: Channel, bin: usize, value: Complex32) -> bool {
        let finite = value.re.is_finite() && value.im.is_finite();
        self.values[channel.index()][bin] = if finite { value } else { ZERO };
        if finite && value != ZERO {
            self.dirty = true;
        }
        !finite
    }

    /// Zero every accumulator
    ///
    /// Cheap when nothing was stored since the previous clear.
    pub fn clear(&mut self) {
        if self.dirty {
            for ch in &mut self.values {
                ch.fill(ZERO);
            }
            self.dirty = false;
        }
    }

    pub fn is_silent(&self) -> bool {
        self.values.iter().all(|ch| ch.iter().all(|v| *v == ZERO))
    }
}
