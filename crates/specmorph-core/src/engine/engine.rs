//! Audio-thread spectral engine
//!
//! One `process` call handles one block of stereo audio, in place:
//!
//! 1. drain the command queue (delay-line swaps, resets)
//! 2. snapshot morph and master atomics once; every frame and the output
//!    stage in this block use that snapshot
//! 3. per sample: feed the overlap-add framer; every hop, run a frame
//! 4. per sample: output stage (gain, clip, balance, master, dry/wet)
//! 5. publish smoothed output levels
//!
//! A frame locks the banks only while it refreshes lookup tables and fills
//! the per-bin parameter scratch. FFTs and the bin transform run unlocked.

use std::sync::Arc;

use basedrop::Owned;

use super::command::EngineCommand;
use super::controller::required_delay_capacity;
use super::gc::gc_handle;
use super::output::{LevelMeter, OutputStage};
use super::overlap_add::OverlapAdd;
use super::shared::SharedState;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::morph::MorphWeights;
use crate::observe::{BlockStats, EngineObserver, NullObserver};
use crate::spectral::{BinDelayLines, BinParameterEvaluator, FrameDecisions, SpectralFrameProcessor};
use crate::types::{StereoBuffer, StereoSample};

/// Real-time spectral effects processor
pub struct SpectralEngine {
    config: EngineConfig,
    shared: Arc<SharedState>,
    commands: rtrb::Consumer<EngineCommand>,
    ola: OverlapAdd,
    spectral: SpectralFrameProcessor,
    meter: LevelMeter,
    observer: Box<dyn EngineObserver>,
    frames_processed: u64,
}

impl SpectralEngine {
    /// Build an engine for `config`, allocating every buffer up front
    ///
    /// Delay lines are sized for the banks' current delay ranges (or the
    /// capacity already published in `shared`, whichever is larger).
    pub fn new(
        config: EngineConfig,
        shared: Arc<SharedState>,
        commands: rtrb::Consumer<EngineCommand>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let hop_size = config.hop_size();

        let capacity = {
            let banks = shared.banks();
            required_delay_capacity(&banks, config.sample_rate, hop_size)
        }
        .max(shared.delay_capacity_frames());
        shared.set_delay_capacity_frames(capacity);

        let lines = Owned::new(&gc_handle(), BinDelayLines::new(config.num_bins(), capacity));
        let spectral = SpectralFrameProcessor::new(config.fft_size, hop_size, config.sample_rate, lines);

        log::info!(
            "Spectral engine: {} Hz, FFT {}, hop {}, delay capacity {} frames",
            config.sample_rate,
            config.fft_size,
            hop_size,
            capacity
        );

        Ok(Self {
            ola: OverlapAdd::new(config.fft_size, config.overlap_factor),
            spectral,
            config,
            shared,
            commands,
            meter: LevelMeter::default(),
            observer: Box::new(NullObserver),
            frames_processed: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Input-to-output delay in samples (equal to the FFT size)
    pub fn latency_samples(&self) -> usize {
        self.ola.latency()
    }

    /// Frames run since construction
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Delay capacity currently installed, in frames
    pub fn delay_capacity(&self) -> usize {
        self.spectral.delay_capacity()
    }

    pub fn set_observer(&mut self, observer: Box<dyn EngineObserver>) {
        self.observer = observer;
    }

    /// Clear framing buffers, delay lines, feedback and meters
    pub fn reset(&mut self) {
        self.ola.reset();
        self.spectral.reset();
        self.meter.reset();
        self.shared.publish_levels([0.0; 2]);
    }

    /// Apply pending control commands
    ///
    /// Called at the top of every block; the only place delay lines change.
    pub fn process_commands(&mut self) {
        while let Ok(cmd) = self.commands.pop() {
            match cmd {
                EngineCommand::SwapDelayLines(lines) => {
                    if lines.num_bins() != self.spectral.num_bins() {
                        continue;
                    }
                    let capacity = lines.capacity();
                    // The old lines are freed on the collector thread
                    drop(self.spectral.swap_delay_lines(lines));
                    self.observer.on_delay_lines_swapped(capacity);
                }
                EngineCommand::Reset => self.reset(),
            }
        }
    }

    /// Process one block of interleaved stereo in place
    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        self.process_samples(buffer.as_mut_slice());
    }

    /// Process one block of split stereo in place
    ///
    /// Only the common length of `left` and `right` is processed.
    pub fn process_channels(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.process_commands();
        let weights = self.shared.morph_weights();
        let stage = self.output_stage(&weights);
        let mut peak = [0.0f32; 2];
        let frames_before = self.frames_processed;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let out = self.tick(StereoSample::new(*l, *r), weights, &stage);
            peak[0] = peak[0].max(out.left.abs());
            peak[1] = peak[1].max(out.right.abs());
            *l = out.left;
            *r = out.right;
        }

        self.finish_block(left.len().min(right.len()), frames_before, peak);
    }

    fn process_samples(&mut self, samples: &mut [StereoSample]) {
        self.process_commands();
        let weights = self.shared.morph_weights();
        let stage = self.output_stage(&weights);
        let mut peak = [0.0f32; 2];
        let frames_before = self.frames_processed;

        for sample in samples.iter_mut() {
            let out = self.tick(*sample, weights, &stage);
            peak[0] = peak[0].max(out.left.abs());
            peak[1] = peak[1].max(out.right.abs());
            *sample = out;
        }

        self.finish_block(samples.len(), frames_before, peak);
    }

    /// Output parameters for this block
    fn output_stage(&self, weights: &MorphWeights) -> OutputStage {
        let master = self.shared.master_settings();
        let banks = self.shared.banks();
        OutputStage::new(&banks, weights, &master)
    }

    #[inline]
    fn tick(&mut self, input: StereoSample, weights: MorphWeights, stage: &OutputStage) -> StereoSample {
        let wet = self.ola.push(input);
        if self.ola.frame_ready() {
            self.run_frame(weights);
        }
        stage.apply(wet, input)
    }

    fn run_frame(&mut self, weights: MorphWeights) {
        let sample_rate = self.config.sample_rate;
        let num_bins = self.spectral.num_bins();

        let decisions = {
            let mut banks = self.shared.banks();
            for bank in banks.iter_mut() {
                bank.rebuild_lut(sample_rate, num_bins);
            }
            let decisions = FrameDecisions::compute(&banks, weights, self.config.fast_paths);
            BinParameterEvaluator::new(&banks, &decisions, sample_rate)
                .fill(self.spectral.params_mut());
            decisions
        };

        let spectrograph = self
            .config
            .spectrograph
            .then(|| self.shared.spectrograph());
        let spectra = self.ola.analyze();
        let stats = self.spectral.process(spectra, &decisions, spectrograph);
        self.ola.synthesize();

        self.observer.on_frame(self.frames_processed, &stats);
        if stats.sanitized > 0 {
            self.observer.on_feedback_sanitized(stats.sanitized);
        }
        self.frames_processed += 1;
    }

    fn finish_block(&mut self, samples: usize, frames_before: u64, peak: [f32; 2]) {
        let levels = self.meter.update(peak);
        self.shared.publish_levels(levels);
        self.observer.on_block(&BlockStats {
            samples,
            frames: (self.frames_processed - frames_before) as usize,
            peak,
            total_frames: self.frames_processed,
        });
    }
}
