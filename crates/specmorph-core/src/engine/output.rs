//! Sample-domain output stage
//!
//! Applied to every reconstructed sample, in order:
//! 1. morph-blended bank gain
//! 2. morph-blended bank soft clip (`T·tanh(s/T)`, only below −0.01 dB)
//! 3. morph-blended bank balance (equal power, unity at centre)
//! 4. master gain and master soft clip
//! 5. dry/wet against the unprocessed input
//!
//! Parameters are resolved once per block so nothing inside the sample loop
//! can change mid-block.

use std::f32::consts::{FRAC_PI_2, SQRT_2};

use crate::bank::ParameterBank;
use crate::morph::MorphWeights;
use crate::types::{StereoSample, NUM_BANKS};
use crate::units::db_to_linear;

/// Clip thresholds at or above this (dB) disable the clipper
const CLIP_OFF_DB: f32 = -0.01;

/// Range of master gain (dB)
pub const MASTER_GAIN_RANGE_DB: (f32, f32) = (-40.0, 12.0);

/// Range of master soft-clip threshold (dB)
pub const MASTER_CLIP_RANGE_DB: (f32, f32) = (-20.0, 0.0);

/// Weight of the new block peak in the smoothed meter value
const METER_ATTACK: f32 = 0.3;

/// Master section settings (lock-free, published as atomics)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasterSettings {
    pub gain_db: f32,
    pub clip_db: f32,
    /// 0 = dry only, 1 = wet only
    pub dry_wet: f32,
}

impl Default for MasterSettings {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            clip_db: 0.0,
            dry_wet: 1.0,
        }
    }
}

/// Resolved per-block output parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputStage {
    bank_gain: f32,
    bank_clip: Option<f32>,
    balance: (f32, f32),
    master_gain: f32,
    master_clip: Option<f32>,
    dry_wet: f32,
}

impl OutputStage {
    /// Blend the banks' output settings and combine with the master section
    pub fn new(
        banks: &[ParameterBank; NUM_BANKS],
        weights: &MorphWeights,
        master: &MasterSettings,
    ) -> Self {
        let gain_db = weights.blend(std::array::from_fn(|b| banks[b].settings().gain_db));
        let clip_db =
            weights.blend(std::array::from_fn(|b| banks[b].settings().soft_clip_threshold_db));
        let pan = weights.blend(std::array::from_fn(|b| banks[b].settings().pan));

        let angle = (pan.clamp(-1.0, 1.0) + 1.0) * 0.5 * FRAC_PI_2;
        Self {
            bank_gain: db_to_linear(gain_db),
            bank_clip: clip_threshold(clip_db),
            balance: (angle.cos() * SQRT_2, angle.sin() * SQRT_2),
            master_gain: db_to_linear(master.gain_db),
            master_clip: clip_threshold(master.clip_db),
            dry_wet: master.dry_wet.clamp(0.0, 1.0),
        }
    }

    /// Stage that passes the wet signal through untouched
    pub fn identity() -> Self {
        Self {
            bank_gain: 1.0,
            bank_clip: None,
            balance: (1.0, 1.0),
            master_gain: 1.0,
            master_clip: None,
            dry_wet: 1.0,
        }
    }

    #[inline]
    pub fn apply(&self, wet: StereoSample, dry: StereoSample) -> StereoSample {
        let mut l = wet.left * self.bank_gain;
        let mut r = wet.right * self.bank_gain;
        if let Some(t) = self.bank_clip {
            l = soft_clip(l, t);
            r = soft_clip(r, t);
        }
        l *= self.balance.0;
        r *= self.balance.1;

        l *= self.master_gain;
        r *= self.master_gain;
        if let Some(t) = self.master_clip {
            l = soft_clip(l, t);
            r = soft_clip(r, t);
        }

        if self.dry_wet < 1.0 {
            l = dry.left + self.dry_wet * (l - dry.left);
            r = dry.right + self.dry_wet * (r - dry.right);
        }
        StereoSample::new(l, r)
    }
}

impl Default for OutputStage {
    fn default() -> Self {
        Self::identity()
    }
}

fn clip_threshold(db: f32) -> Option<f32> {
    (db < CLIP_OFF_DB).then(|| db_to_linear(db))
}

#[inline]
fn soft_clip(sample: f32, threshold: f32) -> f32 {
    threshold * (sample / threshold).tanh()
}

/// Exponentially smoothed per-channel peak meter
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelMeter {
    levels: [f32; 2],
}

impl LevelMeter {
    /// Fold in one block's peaks and return the smoothed levels
    pub fn update(&mut self, block_peak: [f32; 2]) -> [f32; 2] {
        for (level, peak) in self.levels.iter_mut().zip(block_peak) {
            *level = *level * (1.0 - METER_ATTACK) + peak * METER_ATTACK;
        }
        self.levels
    }

    pub fn levels(&self) -> [f32; 2] {
        self.levels
    }

    pub fn reset(&mut self) {
        self.levels = [0.0; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::BankSettings;
    use crate::morph::MorphPosition;

    fn banks() -> [ParameterBank; NUM_BANKS] {
        std::array::from_fn(|_| ParameterBank::new())
    }

    #[test]
    fn test_default_banks_are_transparent() {
        let stage = OutputStage::new(&banks(), &MorphWeights::default(), &MasterSettings::default());
        let s = StereoSample::new(0.7, -0.3);
        let out = stage.apply(s, StereoSample::silence());
        assert!((out.left - 0.7).abs() < 1e-6);
        assert!((out.right + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_gain_blends_in_db() {
        let mut banks = banks();
        banks[1].set_settings(BankSettings {
            gain_db: -12.0,
            ..BankSettings::default()
        });
        let weights = MorphPosition::new(0.5, 0.0).weights();
        let stage = OutputStage::new(&banks, &weights, &MasterSettings::default());
        let out = stage.apply(StereoSample::new(1.0, 1.0), StereoSample::silence());
        assert!((out.left - db_to_linear(-6.0)).abs() < 1e-5);
    }

    #[test]
    fn test_soft_clip_engages_below_zero_db() {
        let mut banks = banks();
        banks[0].set_settings(BankSettings {
            soft_clip_threshold_db: -6.0,
            ..BankSettings::default()
        });
        let stage = OutputStage::new(&banks, &MorphWeights::default(), &MasterSettings::default());
        let t = db_to_linear(-6.0);
        let out = stage.apply(StereoSample::new(2.0, -2.0), StereoSample::silence());
        assert!(out.left < t && out.left > t * 0.99);
        assert!(out.right > -t);
    }

    #[test]
    fn test_balance_hard_left() {
        let mut banks = banks();
        banks[0].set_settings(BankSettings {
            pan: -1.0,
            ..BankSettings::default()
        });
        let stage = OutputStage::new(&banks, &MorphWeights::default(), &MasterSettings::default());
        let out = stage.apply(StereoSample::new(1.0, 1.0), StereoSample::silence());
        assert!((out.left - SQRT_2).abs() < 1e-5);
        assert!(out.right.abs() < 1e-5);
    }

    #[test]
    fn test_master_clip_and_dry_wet() {
        let master = MasterSettings {
            gain_db: 0.0,
            clip_db: -0.005,
            dry_wet: 0.25,
        };
        let stage = OutputStage::new(&banks(), &MorphWeights::default(), &master);
        let out = stage.apply(StereoSample::new(1.0, 0.0), StereoSample::new(0.0, 1.0));
        // -0.005 dB is above the clip cutoff: no clipping
        assert!((out.left - 0.25).abs() < 1e-6);
        assert!((out.right - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_level_meter_smoothing() {
        let mut meter = LevelMeter::default();
        let levels = meter.update([1.0, 0.0]);
        assert!((levels[0] - 0.3).abs() < 1e-6);
        let levels = meter.update([1.0, 0.0]);
        assert!((levels[0] - 0.51).abs() < 1e-6);
        assert_eq!(levels[1], 0.0);
    }
}
