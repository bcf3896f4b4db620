//! STFT framing and overlap-add reconstruction
//!
//! Layout:
//! - a sliding input window of `fft_size` samples per channel
//! - an output ring of `2 × fft_size` samples per channel; reads start
//!   `fft_size` behind writes, which is the engine's fixed latency
//!
//! Every time the input window fills, one frame runs:
//! window → forward real FFT (no analysis window) → caller's spectral
//! transform → inverse real FFT → periodic Hann synthesis window → scale →
//! accumulate into the output ring. The input window then slides by one hop.
//!
//! Each output slot is zeroed right after it is read so the next pass of the
//! ring starts from silence.

use std::f32::consts::PI;
use std::sync::Arc;

use realfft::num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::types::{Channel, StereoSample};

const ZERO: Complex32 = Complex32::new(0.0, 0.0);

/// Overlap-add STFT engine for two channels
pub struct OverlapAdd {
    fft_size: usize,
    hop_size: usize,
    /// Undoes the unnormalized FFT round trip and the summed window overlap
    synthesis_scale: f32,
    window: Vec<f32>,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    forward_scratch: Vec<Complex32>,
    inverse_scratch: Vec<Complex32>,
    /// Sliding analysis window per channel
    input: [Vec<f32>; 2],
    input_pos: usize,
    /// FFT input/output time buffer (realfft consumes its input)
    time: Vec<f32>,
    spectra: [Vec<Complex32>; 2],
    /// Output ring per channel, `2 × fft_size`
    output: [Vec<f32>; 2],
    read_pos: usize,
    write_pos: usize,
}

impl OverlapAdd {
    /// `fft_size` must be a power of two and `overlap` divide it
    pub fn new(fft_size: usize, overlap: usize) -> Self {
        let hop_size = (fft_size / overlap.max(1)).max(1);
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        // Periodic Hann: overlapping copies sum to overlap / 2
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / fft_size as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();
        let window_sum = (fft_size / hop_size) as f32 * 0.5;
        let synthesis_scale = 1.0 / (fft_size as f32 * window_sum);

        let forward_scratch = forward.make_scratch_vec();
        let inverse_scratch = inverse.make_scratch_vec();
        let spectra = std::array::from_fn(|_| forward.make_output_vec());

        Self {
            fft_size,
            hop_size,
            synthesis_scale,
            window,
            forward,
            inverse,
            forward_scratch,
            inverse_scratch,
            input: std::array::from_fn(|_| vec![0.0; fft_size]),
            input_pos: 0,
            time: vec![0.0; fft_size],
            spectra,
            output: std::array::from_fn(|_| vec![0.0; fft_size * 2]),
            read_pos: 0,
            write_pos: fft_size,
        }
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    #[inline]
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Input-to-output delay in samples
    #[inline]
    pub fn latency(&self) -> usize {
        self.fft_size
    }

    /// Feed one input sample and take one output sample
    ///
    /// Check [`frame_ready`](Self::frame_ready) afterwards.
    #[inline]
    pub fn push(&mut self, input: StereoSample) -> StereoSample {
        self.input[0][self.input_pos] = input.left;
        self.input[1][self.input_pos] = input.right;
        self.input_pos += 1;

        let out = StereoSample::new(self.output[0][self.read_pos], self.output[1][self.read_pos]);
        self.output[0][self.read_pos] = 0.0;
        self.output[1][self.read_pos] = 0.0;
        self.read_pos = (self.read_pos + 1) % self.output[0].len();
        out
    }

    /// The input window is full and a frame must run
    #[inline]
    pub fn frame_ready(&self) -> bool {
        self.input_pos >= self.fft_size
    }

    /// Forward-transform the current window
    ///
    /// Returns both channels' spectra (`fft_size / 2 + 1` bins) for in-place
    /// processing before [`synthesize`](Self::synthesize).
    pub fn analyze(&mut self) -> [&mut [Complex32]; 2] {
        for ch in Channel::ALL {
            let c = ch.index();
            self.time.copy_from_slice(&self.input[c]);
            let spectrum = &mut self.spectra[c];
            if self
                .forward
                .process_with_scratch(&mut self.time, spectrum, &mut self.forward_scratch)
                .is_err()
            {
                spectrum.fill(ZERO);
            }
        }
        let [left, right] = &mut self.spectra;
        [left.as_mut_slice(), right.as_mut_slice()]
    }

    /// Inverse-transform the spectra, overlap-add them and slide the window
    pub fn synthesize(&mut self) {
        let ring = self.output[0].len();
        for ch in Channel::ALL {
            let c = ch.index();
            let spectrum = &mut self.spectra[c];
            spectrum[0].im = 0.0;
            if let Some(last) = spectrum.last_mut() {
                last.im = 0.0;
            }
            if self
                .inverse
                .process_with_scratch(spectrum, &mut self.time, &mut self.inverse_scratch)
                .is_err()
            {
                self.time.fill(0.0);
            }

            let out = &mut self.output[c];
            for (i, (&sample, &w)) in self.time.iter().zip(&self.window).enumerate() {
                out[(self.write_pos + i) % ring] += sample * w * self.synthesis_scale;
            }
        }
        self.write_pos = (self.write_pos + self.hop_size) % ring;

        for input in &mut self.input {
            input.copy_within(self.hop_size.., 0);
            let tail = self.fft_size - self.hop_size;
            input[tail..].fill(0.0);
        }
        self.input_pos = self.fft_size - self.hop_size;
    }

    /// Return to the freshly constructed state
    pub fn reset(&mut self) {
        for buf in self.input.iter_mut().chain(self.output.iter_mut()) {
            buf.fill(0.0);
        }
        self.input_pos = 0;
        self.read_pos = 0;
        self.write_pos = self.fft_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_passthrough(ola: &mut OverlapAdd, input: &[StereoSample]) -> Vec<StereoSample> {
        input
            .iter()
            .map(|&s| {
                let out = ola.push(s);
                if ola.frame_ready() {
                    ola.analyze();
                    ola.synthesize();
                }
                out
            })
            .collect()
    }

    #[test]
    fn test_latency_and_unity_gain() {
        let mut ola = OverlapAdd::new(256, 4);
        let n = 256 * 8;
        let input: Vec<StereoSample> = (0..n)
            .map(|i| {
                let t = i as f32 / 48000.0;
                StereoSample::new(
                    (2.0 * PI * 440.0 * t).sin() * 0.5,
                    (2.0 * PI * 1000.0 * t).cos() * 0.25,
                )
            })
            .collect();
        let output = run_passthrough(&mut ola, &input);
        // Fully overlapped region: every output sample has all four contributions
        for i in (256 * 2)..n {
            let expected = input[i - ola.latency()];
            let got = output[i];
            assert!((got.left - expected.left).abs() < 1e-4, "L at {}: {} vs {}", i, got.left, expected.left);
            assert!((got.right - expected.right).abs() < 1e-4, "R at {}", i);
        }
    }

    #[test]
    fn test_first_window_is_silent() {
        let mut ola = OverlapAdd::new(128, 4);
        let input = vec![StereoSample::new(1.0, -1.0); 128];
        let output = run_passthrough(&mut ola, &input);
        assert!(output.iter().all(|s| *s == StereoSample::silence()));
    }

    #[test]
    fn test_reset_clears_pending_output() {
        let mut ola = OverlapAdd::new(128, 4);
        run_passthrough(&mut ola, &vec![StereoSample::new(1.0, 1.0); 300]);
        ola.reset();
        let output = run_passthrough(&mut ola, &vec![StereoSample::silence(); 128]);
        assert!(output.iter().all(|s| *s == StereoSample::silence()));
    }

    #[test]
    fn test_hop_size() {
        let ola = OverlapAdd::new(2048, 4);
        assert_eq!(ola.hop_size(), 512);
        assert_eq!(ola.latency(), 2048);
    }
}
