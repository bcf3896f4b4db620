//! Per-bin parameter evaluation
//!
//! Blends the four banks' cached curve values for one FFT bin with the morph
//! weights and converts the result to physical units. Conversions happen
//! once on the blended value: banks are never converted individually and
//! then averaged.
//!
//! Whole phases can be bypassed through [`SkipFlags`] when every bank's
//! curves for that phase sit at their identity value; the evaluator then
//! returns fixed identity parameters for the phase.

use crate::bank::{BankSettings, ParameterBank};
use crate::morph::MorphWeights;
use crate::types::{Channel, CurveFamily, CurveKind, NUM_BANKS};
use crate::units;

/// Physical parameters of one bin for one frame
///
/// Arrays are indexed by [`Channel::index`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinParameters {
    /// Delay in samples
    pub delay_samples: [f32; 2],
    /// Crossfeed amount, 0 = own side, 1 = opposite side
    pub pan: [f32; 2],
    /// Linear feedback gain
    pub feedback: [f32; 2],
    /// Linear gain applied before gate/clip
    pub pre_gain: [f32; 2],
    /// Linear magnitude below which the bin is silenced
    pub min_gate: [f32; 2],
    /// Linear magnitude above which the bin is limited
    pub max_clip: [f32; 2],
    /// Normalized shift curve value (0.5 = none)
    pub shift: [f32; 2],
    /// Normalized multiply curve value (0.5 = ×1)
    pub multiply: [f32; 2],
}

impl BinParameters {
    /// Parameters that leave a bin untouched
    pub const IDENTITY: BinParameters = BinParameters {
        delay_samples: [0.0; 2],
        pan: [0.0; 2],
        feedback: [0.0; 2],
        pre_gain: [1.0; 2],
        min_gate: [0.0; 2],
        max_clip: [1.0; 2],
        shift: [0.5; 2],
        multiply: [0.5; 2],
    };
}

impl Default for BinParameters {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Phases whose curves are inert in every bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipFlags {
    /// PreGain/MaxClip flat at 1 and MinGate flat at 0
    pub dynamics: bool,
    /// Feedback flat at 0
    pub feedback: bool,
    /// Shift and Multiply flat at 0.5
    pub shift: bool,
}

impl SkipFlags {
    /// Check every bank's curves
    pub fn compute(banks: &[ParameterBank; NUM_BANKS]) -> Self {
        let all_identity = |families: &[CurveFamily]| {
            banks.iter().all(|bank| {
                families.iter().all(|family| {
                    Channel::ALL
                        .iter()
                        .all(|&ch| bank.is_identity(family.curve(ch)))
                })
            })
        };
        Self {
            dynamics: all_identity(&[
                CurveFamily::PreGain,
                CurveFamily::MinGate,
                CurveFamily::MaxClip,
            ]),
            feedback: all_identity(&[CurveFamily::Feedback]),
            shift: all_identity(&[CurveFamily::Shift, CurveFamily::Multiply]),
        }
    }
}

/// Morph-dependent decisions made once per frame under the bank lock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDecisions {
    pub weights: MorphWeights,
    pub skip: SkipFlags,
    /// Voted shift/multiply order
    ///
    /// A weighted vote (`> 0.5`) rather than following the single heaviest
    /// bank; at a four-way split no one bank decides the order.
    pub shift_before_multiply: bool,
    /// Blended delay range per channel (ms)
    pub delay_max_ms: [f32; 2],
    /// Voted delay scale per channel
    pub delay_log_scale: [bool; 2],
}

impl FrameDecisions {
    /// Compute the frame's decisions
    ///
    /// With `fast_paths` off every phase runs in full.
    pub fn compute(
        banks: &[ParameterBank; NUM_BANKS],
        weights: MorphWeights,
        fast_paths: bool,
    ) -> Self {
        let skip = if fast_paths {
            SkipFlags::compute(banks)
        } else {
            SkipFlags::default()
        };
        let settings: [&BankSettings; NUM_BANKS] = std::array::from_fn(|b| banks[b].settings());

        Self {
            weights,
            skip,
            shift_before_multiply: weights.vote(settings.map(|s| s.shift_before_multiply)),
            delay_max_ms: [
                weights.blend(settings.map(|s| s.delay_max_ms[0])),
                weights.blend(settings.map(|s| s.delay_max_ms[1])),
            ],
            delay_log_scale: [
                weights.vote(settings.map(|s| s.delay_log_scale[0])),
                weights.vote(settings.map(|s| s.delay_log_scale[1])),
            ],
        }
    }
}

/// Evaluates [`BinParameters`] from the banks' lookup tables
///
/// Borrowing the banks ties an evaluator to the bank lock's scope.
pub struct BinParameterEvaluator<'a> {
    banks: &'a [ParameterBank; NUM_BANKS],
    decisions: &'a FrameDecisions,
    sample_rate: f32,
}

impl<'a> BinParameterEvaluator<'a> {
    /// The banks' lookup tables must already cover every bin evaluated
    pub fn new(
        banks: &'a [ParameterBank; NUM_BANKS],
        decisions: &'a FrameDecisions,
        sample_rate: f32,
    ) -> Self {
        Self {
            banks,
            decisions,
            sample_rate,
        }
    }

    #[inline]
    fn blend(&self, kind: CurveKind, bin: usize) -> f32 {
        let values = std::array::from_fn(|b| self.banks[b].lut().value(kind, bin));
        self.decisions.weights.blend(values)
    }

    /// Parameters of one bin
    pub fn evaluate(&self, bin: usize) -> BinParameters {
        let skip = self.decisions.skip;
        let mut params = BinParameters::IDENTITY;

        for ch in Channel::ALL {
            let c = ch.index();

            let delay_y = self.blend(CurveFamily::Delay.curve(ch), bin);
            let ms = units::delay_ms(
                delay_y,
                self.decisions.delay_max_ms[c],
                self.decisions.delay_log_scale[c],
            );
            params.delay_samples[c] = units::ms_to_samples(ms, self.sample_rate);
            params.pan[c] = self.blend(CurveFamily::Pan.curve(ch), bin);

            if !skip.feedback {
                params.feedback[c] =
                    units::feedback_gain(self.blend(CurveFamily::Feedback.curve(ch), bin));
            }

            if !skip.dynamics {
                params.pre_gain[c] =
                    units::dynamics_gain(self.blend(CurveFamily::PreGain.curve(ch), bin));
                params.min_gate[c] =
                    units::dynamics_gain(self.blend(CurveFamily::MinGate.curve(ch), bin));
                params.max_clip[c] =
                    units::dynamics_gain(self.blend(CurveFamily::MaxClip.curve(ch), bin));
            }

            if !skip.shift {
                params.shift[c] = self.blend(CurveFamily::Shift.curve(ch), bin);
                params.multiply[c] = self.blend(CurveFamily::Multiply.curve(ch), bin);
            }
        }
        params
    }

    /// Fill `out[bin]` for every bin in `out`
    pub fn fill(&self, out: &mut [BinParameters]) {
        for (bin, params) in out.iter_mut().enumerate() {
            *params = self.evaluate(bin);
        }
    }
}
