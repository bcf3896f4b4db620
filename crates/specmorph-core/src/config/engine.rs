//! Engine construction settings
//!
//! These are fixed for the lifetime of a [`SpectralEngine`](crate::engine::SpectralEngine);
//! changing any of them means building a new engine.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::{DEFAULT_FFT_SIZE, DEFAULT_OVERLAP_FACTOR, DEFAULT_SAMPLE_RATE, MAX_LUT_BINS};

/// Smallest supported FFT size
pub const MIN_FFT_SIZE: usize = 64;

/// Largest supported FFT size (half of it must fit the lookup table)
pub const MAX_FFT_SIZE: usize = MAX_LUT_BINS * 2;

/// Largest supported overlap factor
pub const MAX_OVERLAP_FACTOR: usize = 8;

/// STFT engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz
    /// Default: 48000
    pub sample_rate: f32,

    /// FFT size in samples, power of two in 64..=2048
    /// Also the engine's latency.
    /// Default: 2048
    pub fft_size: usize,

    /// Frames per FFT window, power of two in 2..=8
    /// Hop size is `fft_size / overlap_factor`.
    /// Default: 4
    pub overlap_factor: usize,

    /// Skip spectral phases whose curves are inert in every bank
    /// Default: true
    pub fast_paths: bool,

    /// Capture per-bin magnitudes for display
    /// Default: false
    pub spectrograph: bool,

    /// Largest block passed to `process` at once; the renderer reads its
    /// input in blocks of this size
    /// Default: 8192
    pub max_block_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE as f32,
            fft_size: DEFAULT_FFT_SIZE,
            overlap_factor: DEFAULT_OVERLAP_FACTOR,
            fast_paths: true,
            spectrograph: false,
            max_block_size: 8192,
        }
    }
}

impl EngineConfig {
    /// Check every field is usable
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(self.sample_rate));
        }
        if !self.fft_size.is_power_of_two()
            || self.fft_size < MIN_FFT_SIZE
            || self.fft_size > MAX_FFT_SIZE
        {
            return Err(EngineError::InvalidFftSize {
                size: self.fft_size,
                min: MIN_FFT_SIZE,
                max: MAX_FFT_SIZE,
            });
        }
        if !self.overlap_factor.is_power_of_two()
            || self.overlap_factor < 2
            || self.overlap_factor > MAX_OVERLAP_FACTOR
            || self.overlap_factor >= self.fft_size
        {
            return Err(EngineError::InvalidOverlap {
                overlap: self.overlap_factor,
                fft_size: self.fft_size,
            });
        }
        if self.max_block_size == 0 {
            return Err(EngineError::InvalidBlockSize(self.max_block_size));
        }
        Ok(())
    }

    /// Samples between successive frames
    #[inline]
    pub fn hop_size(&self) -> usize {
        self.fft_size / self.overlap_factor.max(1)
    }

    /// Bins processed per frame
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 48000.0);
        assert_eq!(config.fft_size, 2048);
        assert_eq!(config.overlap_factor, 4);
        assert_eq!(config.hop_size(), 512);
        assert_eq!(config.num_bins(), 1024);
        assert!(config.fast_paths);
        assert!(!config.spectrograph);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_fft_size() {
        for size in [0, 100, 32, 4096] {
            let config = EngineConfig {
                fft_size: size,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(EngineError::InvalidFftSize { .. })),
                "size {} should be rejected",
                size
            );
        }
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let config = EngineConfig {
            max_block_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(EngineError::InvalidBlockSize(0)));
    }

    #[test]
    fn test_invalid_overlap() {
        for overlap in [0, 1, 3, 16] {
            let config = EngineConfig {
                overlap_factor: overlap,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(EngineError::InvalidOverlap { .. })));
        }
    }

    #[test]
    fn test_invalid_sample_rate() {
        let config = EngineConfig {
            sample_rate: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidSampleRate(_))));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: EngineConfig = serde_yaml::from_str("fft_size: 1024\nspectrograph: true\n").unwrap();
        assert_eq!(config.fft_size, 1024);
        assert!(config.spectrograph);
        assert_eq!(config.overlap_factor, 4);
        assert_eq!(config.hop_size(), 256);
    }
}
