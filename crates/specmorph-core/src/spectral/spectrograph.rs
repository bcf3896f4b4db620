//! UI-facing magnitude snapshot
//!
//! The audio thread publishes per-bin magnitudes (dB) after the dynamics
//! stage. Publishing uses `try_lock` only: if the UI is mid-read the frame's
//! capture is skipped, never waited for.

use parking_lot::{Mutex, MutexGuard};

use crate::types::MAX_LUT_BINS;

/// Floor of the displayed magnitude range (dB)
pub const SPECTROGRAPH_FLOOR_DB: f32 = -60.0;

/// One published magnitude frame
#[derive(Debug, Clone)]
pub struct SpectrographFrame {
    /// Per channel, per bin magnitude in dB, floored at −60
    pub magnitudes_db: [Vec<f32>; 2],
    /// Bins valid in `magnitudes_db`
    pub num_bins: usize,
    /// Incremented on every successful publish
    pub sequence: u64,
}

/// Try-lock guarded magnitude buffer shared with the UI
#[derive(Debug)]
pub struct Spectrograph {
    frame: Mutex<SpectrographFrame>,
}

impl Spectrograph {
    pub fn new() -> Self {
        Self {
            frame: Mutex::new(SpectrographFrame {
                magnitudes_db: std::array::from_fn(|_| vec![SPECTROGRAPH_FLOOR_DB; MAX_LUT_BINS]),
                num_bins: 0,
                sequence: 0,
            }),
        }
    }

    /// Publish a frame from the audio thread
    ///
    /// Returns false (and drops the frame) if the lock is held elsewhere.
    pub fn publish(&self, left: &[f32], right: &[f32]) -> bool {
        let Some(mut frame) = self.frame.try_lock() else {
            return false;
        };
        let n = left.len().min(right.len()).min(MAX_LUT_BINS);
        frame.magnitudes_db[0][..n].copy_from_slice(&left[..n]);
        frame.magnitudes_db[1][..n].copy_from_slice(&right[..n]);
        frame.num_bins = n;
        frame.sequence = frame.sequence.wrapping_add(1);
        true
    }

    /// Hold the frame for reading (UI side)
    pub fn read(&self) -> MutexGuard<'_, SpectrographFrame> {
        self.frame.lock()
    }

    /// Copy of the latest frame
    pub fn snapshot(&self) -> SpectrographFrame {
        self.frame.lock().clone()
    }
}

impl Default for Spectrograph {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a normalized magnitude to display dB
#[inline]
pub fn magnitude_db(normalized: f32) -> f32 {
    if normalized > 0.0 {
        (20.0 * normalized.log10()).max(SPECTROGRAPH_FLOOR_DB)
    } else {
        SPECTROGRAPH_FLOOR_DB
    }
}
