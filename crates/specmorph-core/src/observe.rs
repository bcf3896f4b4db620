//! Hooks for watching the audio thread
//!
//! The audio thread never logs directly. It reports events to an
//! [`EngineObserver`], which by default discards them. [`LogObserver`]
//! forwards them to the `log` facade for offline rendering and tests.
//!
//! Observer methods are called from the audio callback and must not block.

use crate::spectral::FrameStats;

/// Summary of one processed block
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockStats {
    /// Samples in the block
    pub samples: usize,
    /// Frames run during the block
    pub frames: usize,
    /// Output peak per channel
    pub peak: [f32; 2],
    /// Frames processed since construction
    pub total_frames: u64,
}

/// Receives audio-thread events
pub trait EngineObserver: Send {
    /// One spectral frame finished (`index` counts from zero)
    fn on_frame(&mut self, _index: u64, _stats: &FrameStats) {}

    /// One `process` call finished
    fn on_block(&mut self, _stats: &BlockStats) {}

    /// Larger delay lines were installed
    fn on_delay_lines_swapped(&mut self, _capacity_frames: usize) {}

    /// Non-finite feedback values were zeroed during a frame
    fn on_feedback_sanitized(&mut self, _count: usize) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl EngineObserver for NullObserver {}

/// Forwards events to `log`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl EngineObserver for LogObserver {
    fn on_frame(&mut self, index: u64, stats: &FrameStats) {
        log::trace!(
            "frame {}: skip dyn={} fb={} shift={} shift_first={}",
            index,
            stats.skip.dynamics,
            stats.skip.feedback,
            stats.skip.shift,
            stats.shift_before_multiply
        );
    }

    fn on_block(&mut self, stats: &BlockStats) {
        log::trace!(
            "block: {} samples, {} frames, peak L={:.3} R={:.3}",
            stats.samples,
            stats.frames,
            stats.peak[0],
            stats.peak[1]
        );
    }

    fn on_delay_lines_swapped(&mut self, capacity_frames: usize) {
        log::debug!("Delay lines swapped: capacity {} frames", capacity_frames);
    }

    fn on_feedback_sanitized(&mut self, count: usize) {
        log::warn!("Zeroed {} non-finite feedback values", count);
    }
}
