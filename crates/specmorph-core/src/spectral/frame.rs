//! Three-phase spectral frame transform
//!
//! Runs once per FFT hop on both channels' spectra, in place:
//!
//! 1. **Injection & dynamics**: add last frame's feedback, apply pre-gain,
//!    then gate/clip on the normalized bin magnitude. Magnitudes are
//!    captured for the spectrograph.
//! 2. **Shift / multiply**: forward-scatter each bin to its target
//!    frequency, splitting it linearly between the two neighbouring bins.
//! 3. **Delay, pan, feedback store**: per-bin hop-granular delay, equal-power
//!    crossfeed, then the post-pan value scaled by the feedback gain becomes
//!    next frame's injection.
//!
//! Each phase has a fast path taken when its curves are inert in every bank.
//! All scratch storage is allocated at construction; processing a frame
//! never allocates.

use std::f32::consts::FRAC_PI_2;

use basedrop::Owned;
use realfft::num_complex::Complex32;

use super::delay_line::BinDelayLines;
use super::evaluator::{BinParameters, FrameDecisions, SkipFlags};
use super::feedback::FeedbackState;
use super::spectrograph::{magnitude_db, Spectrograph};
use crate::types::Channel;
use crate::units;

const ZERO: Complex32 = Complex32::new(0.0, 0.0);

/// Shortest delay (ms) that may carry feedback
const MIN_FEEDBACK_DELAY_MS: f32 = 1.0;

/// What happened in one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    pub skip: SkipFlags,
    pub shift_before_multiply: bool,
    /// Feedback values forced to zero because they were not finite
    pub sanitized: usize,
    /// A spectrograph frame was published
    pub spectrograph_published: bool,
}

/// Per-frame bin transform with its persistent state
pub struct SpectralFrameProcessor {
    fft_size: usize,
    num_bins: usize,
    hop_size: usize,
    sample_rate: f32,
    min_feedback_frames: usize,
    /// Filled by the caller each frame, one entry per bin
    params: Vec<BinParameters>,
    /// Phase 1 output
    injected: [Vec<Complex32>; 2],
    /// Phase 2 output
    scattered: [Vec<Complex32>; 2],
    /// Phase 1 magnitudes for the spectrograph (dB)
    magnitudes: [Vec<f32>; 2],
    delay_lines: Owned<BinDelayLines>,
    feedback: FeedbackState,
}

impl SpectralFrameProcessor {
    /// Create a processor for `fft_size`/`hop_size` framing
    ///
    /// `delay_lines` must cover `fft_size / 2` bins.
    pub fn new(
        fft_size: usize,
        hop_size: usize,
        sample_rate: f32,
        delay_lines: Owned<BinDelayLines>,
    ) -> Self {
        let num_bins = fft_size / 2;
        let hop = hop_size.max(1);
        let min_feedback_frames =
            ((units::ms_to_samples(MIN_FEEDBACK_DELAY_MS, sample_rate) / hop as f32) as usize).max(1);
        Self {
            fft_size,
            num_bins,
            hop_size: hop,
            sample_rate,
            min_feedback_frames,
            params: vec![BinParameters::IDENTITY; num_bins],
            injected: std::array::from_fn(|_| vec![ZERO; num_bins]),
            scattered: std::array::from_fn(|_| vec![ZERO; num_bins]),
            magnitudes: std::array::from_fn(|_| vec![0.0; num_bins]),
            delay_lines,
            feedback: FeedbackState::new(num_bins),
        }
    }

    /// Bins processed per frame (`fft_size / 2`; Nyquist is dropped)
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Per-bin parameters for the next frame
    #[inline]
    pub fn params_mut(&mut self) -> &mut [BinParameters] {
        &mut self.params
    }

    /// Delay capacity currently installed, in frames
    pub fn delay_capacity(&self) -> usize {
        self.delay_lines.capacity()
    }

    /// Install new delay lines, returning the old ones
    ///
    /// Dropping the returned lines hands them to the collector thread.
    pub fn swap_delay_lines(&mut self, lines: Owned<BinDelayLines>) -> Owned<BinDelayLines> {
        std::mem::replace(&mut self.delay_lines, lines)
    }

    /// Forget all delayed and fed-back signal
    pub fn reset(&mut self) {
        self.delay_lines.clear();
        self.feedback.clear();
    }

    /// Transform one frame of both channels in place
    ///
    /// `spectra` are the real FFT outputs (`fft_size / 2 + 1` bins). Bin 0
    /// and Nyquist leave with no imaginary part; Nyquist is zeroed.
    pub fn process(
        &mut self,
        mut spectra: [&mut [Complex32]; 2],
        decisions: &FrameDecisions,
        spectrograph: Option<&Spectrograph>,
    ) -> FrameStats {
        let skip = decisions.skip;
        let n = self.num_bins;
        if spectra.iter().any(|s| s.len() < n) {
            return FrameStats::default();
        }
        self.inject_and_limit(&spectra, skip, spectrograph.is_some());

        let spectrograph_published = match spectrograph {
            Some(spec) => spec.publish(&self.magnitudes[0], &self.magnitudes[1]),
            None => false,
        };

        if !skip.shift {
            self.scatter(decisions.shift_before_multiply);
        }

        let sanitized = self.delay_pan_store(&mut spectra, skip);

        if skip.feedback {
            self.feedback.clear();
        }

        for spectrum in spectra.iter_mut() {
            spectrum[0].im = 0.0;
            for bin in spectrum.iter_mut().skip(n) {
                *bin = ZERO;
            }
        }

        FrameStats {
            skip,
            shift_before_multiply: decisions.shift_before_multiply,
            sanitized,
            spectrograph_published,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Phase 1: feedback injection, pre-gain, gate / clip
    // ─────────────────────────────────────────────────────────────

    fn inject_and_limit(&mut self, spectra: &[&mut [Complex32]; 2], skip: SkipFlags, capture: bool) {
        let half_n = self.fft_size as f32 * 0.5;
        for ch in Channel::ALL {
            let c = ch.index();
            for bin in 0..self.num_bins {
                let mut v = spectra[c][bin];
                if bin == 0 {
                    v.im = 0.0;
                }
                if !skip.feedback {
                    v += self.feedback.get(ch, bin);
                }

                let p = &self.params[bin];
                if !skip.dynamics {
                    v = v * p.pre_gain[c];
                    let mag = v.norm();
                    let normalized = mag / half_n;
                    if normalized < p.min_gate[c] {
                        v = ZERO;
                    } else if normalized > p.max_clip[c] && mag > 0.0 {
                        v = v * (p.max_clip[c] * half_n / mag);
                    }
                }

                if capture {
                    self.magnitudes[c][bin] = magnitude_db(v.norm() / half_n);
                }
                self.injected[c][bin] = v;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Phase 2: shift / multiply forward scatter
    // ─────────────────────────────────────────────────────────────

    fn scatter(&mut self, shift_before_multiply: bool) {
        let n = self.num_bins;
        let bins_per_hz = self.fft_size as f32 / self.sample_rate;
        for ch in Channel::ALL {
            let c = ch.index();
            let out = &mut self.scattered[c];
            out.fill(ZERO);
            for bin in 0..n {
                let v = self.injected[c][bin];
                if v == ZERO {
                    continue;
                }
                let p = &self.params[bin];
                let freq = units::bin_frequency(bin, self.sample_rate, self.fft_size);
                let shift = units::shift_hz(p.shift[c]);
                let mult = units::multiply_factor(p.multiply[c]);
                let target_freq = if shift_before_multiply {
                    (freq + shift) * mult
                } else {
                    freq * mult + shift
                };
                let target = target_freq * bins_per_hz;

                if target >= 0.0 && target < (n - 1) as f32 {
                    let lo = target as usize;
                    let frac = target - lo as f32;
                    out[lo] += v * (1.0 - frac);
                    out[lo + 1] += v * frac;
                } else if target >= (n - 1) as f32 && target < n as f32 {
                    out[n - 1] += v;
                }
                // Anything else (negative, past the top, NaN) is dropped
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Phase 3: delay, pan crossfeed, feedback store
    // ─────────────────────────────────────────────────────────────

    fn delay_pan_store(&mut self, spectra: &mut [&mut [Complex32]; 2], skip: SkipFlags) -> usize {
        let source = if skip.shift {
            &self.injected
        } else {
            &self.scattered
        };
        let mut sanitized = 0;

        for bin in 0..self.num_bins {
            let p = &self.params[bin];
            let frames = [
                delay_frames(p.delay_samples[0], self.hop_size),
                delay_frames(p.delay_samples[1], self.hop_size),
            ];
            let dl = self
                .delay_lines
                .process(Channel::Left, bin, frames[0], source[0][bin]);
            let dr = self
                .delay_lines
                .process(Channel::Right, bin, frames[1], source[1][bin]);

            let (l_self, l_cross) = pan_gains(p.pan[0]);
            let (r_self, r_cross) = pan_gains(p.pan[1]);
            let out = [dl * l_self + dr * r_cross, dr * r_self + dl * l_cross];

            if !skip.feedback {
                for ch in Channel::ALL {
                    let c = ch.index();
                    let fb = if frames[c] >= self.min_feedback_frames {
                        out[c] * p.feedback[c]
                    } else {
                        ZERO
                    };
                    if self.feedback.store(ch, bin, fb) {
                        sanitized += 1;
                    }
                }
            }

            spectra[0][bin] = out[0];
            spectra[1][bin] = out[1];
        }
        sanitized
    }
}

/// Whole hops contained in a delay given in samples
#[inline]
fn delay_frames(delay_samples: f32, hop_size: usize) -> usize {
    if delay_samples.is_finite() && delay_samples > 0.0 {
        delay_samples as usize / hop_size
    } else {
        0
    }
}

/// Equal-power (to-self, to-other) gains for a pan amount in [0, 1]
#[inline]
fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = pan.clamp(0.0, 1.0) * FRAC_PI_2;
    (angle.cos(), angle.sin())
}
