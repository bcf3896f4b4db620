//! Per-bin curve lookup tables
//!
//! Evaluating 16 curves × up to 1024 bins × 4 banks every frame is far too
//! slow for the audio thread. Each bank instead keeps one row of cached curve
//! values per curve, and only rebuilds what changed:
//!
//! - `(sample_rate, num_bins)` changed → recompute the bin → log-frequency
//!   positions and rebuild every row
//! - otherwise → rebuild only rows whose curve version moved
//!
//! Storage is allocated once at construction; rebuilding never allocates.

use crate::curve::PiecewiseCurve;
use crate::types::{CurveKind, MAX_LUT_BINS, NUM_CURVES};
use crate::units;

/// Sample rates closer than this are treated as the same key
const SAMPLE_RATE_EPSILON: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
struct LutKey {
    sample_rate: f32,
    num_bins: usize,
}

/// Cached normalized curve values, one row per curve
#[derive(Debug, Clone)]
pub struct CurveLut {
    /// NUM_CURVES rows of MAX_LUT_BINS values
    values: Vec<f32>,
    /// Normalized log-frequency position of each bin
    positions: Vec<f32>,
    row_versions: [Option<u32>; NUM_CURVES],
    key: Option<LutKey>,
}

impl CurveLut {
    pub fn new() -> Self {
        Self {
            values: vec![0.0; NUM_CURVES * MAX_LUT_BINS],
            positions: vec![0.0; MAX_LUT_BINS],
            row_versions: [None; NUM_CURVES],
            key: None,
        }
    }

    /// Bins covered by the current key (0 before the first rebuild)
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.key.map_or(0, |k| k.num_bins)
    }

    /// Cached values of one curve for the current bin count
    #[inline]
    pub fn row(&self, kind: CurveKind) -> &[f32] {
        let start = kind.index() * MAX_LUT_BINS;
        &self.values[start..start + self.num_bins()]
    }

    /// Cached value of one curve at one bin
    #[inline]
    pub fn value(&self, kind: CurveKind, bin: usize) -> f32 {
        self.values[kind.index() * MAX_LUT_BINS + bin]
    }

    /// Bring the table up to date with `curves`
    ///
    /// `num_bins` is capped at [`MAX_LUT_BINS`]; the FFT size is taken as
    /// twice the bin count. Returns the number of rows rebuilt.
    pub fn rebuild(
        &mut self,
        curves: &[PiecewiseCurve; NUM_CURVES],
        sample_rate: f32,
        num_bins: usize,
    ) -> usize {
        let num_bins = num_bins.min(MAX_LUT_BINS);
        let key_changed = match self.key {
            Some(key) => {
                (key.sample_rate - sample_rate).abs() > SAMPLE_RATE_EPSILON
                    || key.num_bins != num_bins
            }
            None => true,
        };

        if key_changed {
            let fft_size = num_bins * 2;
            for (bin, pos) in self.positions[..num_bins].iter_mut().enumerate() {
                let freq = units::bin_frequency(bin, sample_rate, fft_size);
                *pos = units::frequency_to_normalized(freq, sample_rate);
            }
            self.key = Some(LutKey {
                sample_rate,
                num_bins,
            });
        }

        let mut rebuilt = 0;
        for (row, curve) in curves.iter().enumerate() {
            if !key_changed && self.row_versions[row] == Some(curve.version()) {
                continue;
            }
            let start = row * MAX_LUT_BINS;
            let dst = &mut self.values[start..start + num_bins];
            for (value, &pos) in dst.iter_mut().zip(&self.positions[..num_bins]) {
                *value = curve.evaluate(pos);
            }
            self.row_versions[row] = Some(curve.version());
            rebuilt += 1;
        }
        rebuilt
    }
}

impl Default for CurveLut {
    fn default() -> Self {
        Self::new()
    }
}
