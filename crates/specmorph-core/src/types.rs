//! Common types for specmorph
//!
//! This module contains the fundamental audio types used throughout the
//! engine: stereo sample/buffer handling, channel and curve identifiers,
//! and the fixed dimensions of the parameter model.

use std::ops::{Index, IndexMut};

/// Default sample rate (48kHz - standard professional audio rate)
/// This is the default; the host's actual rate is passed at construction.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Number of parameter banks blended by the morph pad (A, B, C, D)
pub const NUM_BANKS: usize = 4;

/// Number of curves per bank (8 parameter families × 2 channels)
pub const NUM_CURVES: usize = 16;

/// Upper bound on the number of bins a bank's lookup table covers
pub const MAX_LUT_BINS: usize = 1024;

/// Default FFT size (analysis window length in samples)
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// Default overlap factor (hop = fft_size / overlap)
pub const DEFAULT_OVERLAP_FACTOR: usize = 4;

/// Audio sample type
pub type Sample = f32;

/// Stereo channel identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Channel {
    Left = 0,
    Right = 1,
}

impl Channel {
    /// Both channels in order
    pub const ALL: [Channel; 2] = [Channel::Left, Channel::Right];

    /// Array index of this channel (0 = left, 1 = right)
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The opposite channel
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Channel::Left => Channel::Right,
            Channel::Right => Channel::Left,
        }
    }

    /// Single-letter suffix used in persisted field names ("L" / "R")
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::Left => "L",
            Channel::Right => "R",
        }
    }
}

/// Parameter families, each present once per channel in every bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveFamily {
    Delay,
    Pan,
    Feedback,
    PreGain,
    MinGate,
    MaxClip,
    Shift,
    Multiply,
}

impl CurveFamily {
    /// All families in bank storage order
    pub const ALL: [CurveFamily; 8] = [
        CurveFamily::Delay,
        CurveFamily::Pan,
        CurveFamily::Feedback,
        CurveFamily::PreGain,
        CurveFamily::MinGate,
        CurveFamily::MaxClip,
        CurveFamily::Shift,
        CurveFamily::Multiply,
    ];

    /// Normalized curve value at which this family has no effect
    ///
    /// Delay/Pan/Feedback/MinGate sit at 0, PreGain/MaxClip at unity (1.0),
    /// Shift/Multiply at the centre of their range (0.5 = 0 Hz / ×1).
    pub fn identity(self) -> f32 {
        match self {
            CurveFamily::Delay
            | CurveFamily::Pan
            | CurveFamily::Feedback
            | CurveFamily::MinGate => 0.0,
            CurveFamily::PreGain | CurveFamily::MaxClip => 1.0,
            CurveFamily::Shift | CurveFamily::Multiply => 0.5,
        }
    }

    /// The curve of this family for a channel
    #[inline]
    pub fn curve(self, channel: Channel) -> CurveKind {
        let base = match self {
            CurveFamily::Delay => 0,
            CurveFamily::Pan => 2,
            CurveFamily::Feedback => 4,
            CurveFamily::PreGain => 6,
            CurveFamily::MinGate => 8,
            CurveFamily::MaxClip => 10,
            CurveFamily::Shift => 12,
            CurveFamily::Multiply => 14,
        };
        CurveKind::ALL[base + channel.index()]
    }

    /// Lower-camel persisted name prefix ("delay", "preGain", ...)
    pub fn key(self) -> &'static str {
        match self {
            CurveFamily::Delay => "delay",
            CurveFamily::Pan => "pan",
            CurveFamily::Feedback => "feedback",
            CurveFamily::PreGain => "preGain",
            CurveFamily::MinGate => "minGate",
            CurveFamily::MaxClip => "maxClip",
            CurveFamily::Shift => "shift",
            CurveFamily::Multiply => "multiply",
        }
    }
}

/// Curve identifiers, in the fixed order curves are stored in a bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum CurveKind {
    DelayL = 0,
    DelayR = 1,
    PanL = 2,
    PanR = 3,
    FeedbackL = 4,
    FeedbackR = 5,
    PreGainL = 6,
    PreGainR = 7,
    MinGateL = 8,
    MinGateR = 9,
    MaxClipL = 10,
    MaxClipR = 11,
    ShiftL = 12,
    ShiftR = 13,
    MultiplyL = 14,
    MultiplyR = 15,
}

impl CurveKind {
    /// Get all curves in storage order
    pub const ALL: [CurveKind; NUM_CURVES] = [
        CurveKind::DelayL,
        CurveKind::DelayR,
        CurveKind::PanL,
        CurveKind::PanR,
        CurveKind::FeedbackL,
        CurveKind::FeedbackR,
        CurveKind::PreGainL,
        CurveKind::PreGainR,
        CurveKind::MinGateL,
        CurveKind::MinGateR,
        CurveKind::MaxClipL,
        CurveKind::MaxClipR,
        CurveKind::ShiftL,
        CurveKind::ShiftR,
        CurveKind::MultiplyL,
        CurveKind::MultiplyR,
    ];

    /// Convert from index (0-15) to CurveKind
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Storage index of this curve within a bank
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Parameter family of this curve
    pub fn family(self) -> CurveFamily {
        CurveFamily::ALL[self.index() / 2]
    }

    /// Channel this curve drives
    #[inline]
    pub fn channel(self) -> Channel {
        if self.index() % 2 == 0 {
            Channel::Left
        } else {
            Channel::Right
        }
    }

    /// Same family, opposite channel
    pub fn mirror(self) -> Self {
        self.family().curve(self.channel().other())
    }

    /// No-op value for this curve
    #[inline]
    pub fn identity(self) -> f32 {
        self.family().identity()
    }

    /// Persisted field name ("delayL", "maxClipR", ...)
    pub fn key(self) -> &'static str {
        const KEYS: [&str; NUM_CURVES] = [
            "delayL", "delayR", "panL", "panR", "feedbackL", "feedbackR", "preGainL", "preGainR",
            "minGateL", "minGateR", "maxClipL", "maxClipR", "shiftL", "shiftR", "multiplyL",
            "multiplyR",
        ];
        KEYS[self.index()]
    }
}

/// A single stereo sample (left and right channels)
///
/// Uses `#[repr(C)]` to ensure predictable memory layout: [left, right].
/// This enables zero-copy conversion between `&[StereoSample]` and `&[f32]`
/// (interleaved format) using bytemuck.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    /// Create a new stereo sample
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo sample
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Sample of one channel
    #[inline]
    pub fn channel(&self, channel: Channel) -> Sample {
        match channel {
            Channel::Left => self.left,
            Channel::Right => self.right,
        }
    }

    /// Get the peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

/// A buffer of stereo samples
///
/// The in-place processing unit of the engine: one block of host audio.
#[derive(Debug, Clone)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create a new buffer with the specified capacity (in stereo samples)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    /// Create a buffer from separate left and right channel slices
    ///
    /// The shorter slice determines the length.
    pub fn from_channels(left: &[Sample], right: &[Sample]) -> Self {
        let samples = left
            .iter()
            .zip(right.iter())
            .map(|(&l, &r)| StereoSample::new(l, r))
            .collect();
        Self { samples }
    }

    /// Create a buffer from a vector of stereo samples
    pub fn from_vec(samples: Vec<StereoSample>) -> Self {
        Self { samples }
    }

    /// Get the number of stereo samples in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fill the buffer with silence
    pub fn fill_silence(&mut self) {
        self.samples.fill(StereoSample::silence());
    }

    /// Remove every sample, keeping the allocation
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Append one sample
    pub fn push(&mut self, sample: StereoSample) {
        self.samples.push(sample);
    }

    /// Get a slice of the samples
    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.samples
    }

    /// Get a mutable slice of the samples
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }

    /// Get the samples as interleaved f32 slice [L, R, L, R, ...]
    ///
    /// Zero-copy thanks to `#[repr(C)]` on StereoSample.
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.samples)
    }

    /// Copy to separate left and right channel buffers
    pub fn to_channels(&self, left: &mut [Sample], right: &mut [Sample]) {
        for ((sample, l), r) in self.samples.iter().zip(left.iter_mut()).zip(right.iter_mut()) {
            *l = sample.left;
            *r = sample.right;
        }
    }

    /// Iterate over samples
    pub fn iter(&self) -> impl Iterator<Item = &StereoSample> {
        self.samples.iter()
    }

    /// Iterate over mutable samples
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StereoSample> {
        self.samples.iter_mut()
    }

    /// Get the peak amplitude in the buffer
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.peak()).fold(0.0, f32::max)
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

impl Default for StereoBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FFT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_kind_order_and_index() {
        for (i, kind) in CurveKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(CurveKind::from_index(i), Some(*kind));
        }
        assert_eq!(CurveKind::from_index(NUM_CURVES), None);
    }

    #[test]
    fn test_curve_kind_family_channel_roundtrip() {
        for kind in CurveKind::ALL {
            assert_eq!(kind.family().curve(kind.channel()), kind);
            assert_eq!(kind.mirror().mirror(), kind);
            assert_ne!(kind.mirror().channel(), kind.channel());
        }
        assert_eq!(CurveKind::MaxClipL.mirror(), CurveKind::MaxClipR);
        assert_eq!(CurveKind::ShiftR.family(), CurveFamily::Shift);
    }

    #[test]
    fn test_curve_keys_match_family_and_channel() {
        for kind in CurveKind::ALL {
            let expected = format!("{}{}", kind.family().key(), kind.channel().suffix());
            assert_eq!(kind.key(), expected);
        }
    }

    #[test]
    fn test_identity_values() {
        assert_eq!(CurveKind::DelayL.identity(), 0.0);
        assert_eq!(CurveKind::PreGainR.identity(), 1.0);
        assert_eq!(CurveKind::MaxClipL.identity(), 1.0);
        assert_eq!(CurveKind::MinGateR.identity(), 0.0);
        assert_eq!(CurveKind::MultiplyL.identity(), 0.5);
    }

    #[test]
    fn test_stereo_buffer_interleaved_layout() {
        let buf = StereoBuffer::from_channels(&[1.0, 3.0], &[2.0, 4.0]);
        assert_eq!(buf.as_interleaved(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buf.peak(), 4.0);
    }
}
