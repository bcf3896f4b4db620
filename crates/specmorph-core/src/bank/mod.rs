//! Parameter banks
//!
//! A bank is one complete, independently authored parameter set: sixteen
//! frequency curves plus a handful of scalar settings. Four banks (A–D) are
//! blended by the morph pad.
//!
//! Each bank owns a [`CurveLut`] that caches its curves per FFT bin.

mod lut;

pub use lut::CurveLut;

use crate::curve::{PiecewiseCurve, FLAT_TOLERANCE};
use crate::error::CurveEditError;
use crate::types::{Channel, CurveFamily, CurveKind, NUM_CURVES};
use crate::units;

/// Default per-channel delay range in milliseconds
pub const DEFAULT_DELAY_MAX_MS: f32 = 1000.0;

/// Range accepted for per-channel delay maximum (ms)
pub const DELAY_MAX_RANGE_MS: (f32, f32) = (1.0, 99000.0);

/// Range of bank output gain (dB)
pub const BANK_GAIN_RANGE_DB: (f32, f32) = (-40.0, 12.0);

/// Range of bank soft-clip threshold (dB); 0 dB disables the clipper
pub const SOFT_CLIP_RANGE_DB: (f32, f32) = (-20.0, 0.0);

/// Scalar settings of a bank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BankSettings {
    /// Output gain in dB
    pub gain_db: f32,
    /// Soft-clip threshold in dB (≥ −0.01 dB means off)
    pub soft_clip_threshold_db: f32,
    /// Output balance, −1 (left) .. 1 (right)
    pub pan: f32,
    /// Delay curve range per channel (ms)
    pub delay_max_ms: [f32; 2],
    /// Delay curves use `max^y` instead of `y·max`
    pub delay_log_scale: [bool; 2],
    /// Shift is applied before multiply when true
    pub shift_before_multiply: bool,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            soft_clip_threshold_db: 0.0,
            pan: 0.0,
            delay_max_ms: [DEFAULT_DELAY_MAX_MS; 2],
            delay_log_scale: [false; 2],
            shift_before_multiply: true,
        }
    }
}

impl BankSettings {
    /// Clamp every field into its accepted range
    pub fn clamped(mut self) -> Self {
        self.gain_db = self.gain_db.clamp(BANK_GAIN_RANGE_DB.0, BANK_GAIN_RANGE_DB.1);
        self.soft_clip_threshold_db = self
            .soft_clip_threshold_db
            .clamp(SOFT_CLIP_RANGE_DB.0, SOFT_CLIP_RANGE_DB.1);
        self.pan = self.pan.clamp(-1.0, 1.0);
        for max in &mut self.delay_max_ms {
            *max = max.clamp(DELAY_MAX_RANGE_MS.0, DELAY_MAX_RANGE_MS.1);
        }
        self
    }
}

/// One of the four morphable parameter sets
#[derive(Debug, Clone)]
pub struct ParameterBank {
    curves: [PiecewiseCurve; NUM_CURVES],
    settings: BankSettings,
    lut: CurveLut,
}

impl ParameterBank {
    /// Create a bank with every curve at its identity value
    pub fn new() -> Self {
        Self {
            curves: std::array::from_fn(|i| PiecewiseCurve::new(CurveKind::ALL[i].identity())),
            settings: BankSettings::default(),
            lut: CurveLut::new(),
        }
    }

    #[inline]
    pub fn curve(&self, kind: CurveKind) -> &PiecewiseCurve {
        &self.curves[kind.index()]
    }

    #[inline]
    pub fn curve_mut(&mut self, kind: CurveKind) -> &mut PiecewiseCurve {
        &mut self.curves[kind.index()]
    }

    pub fn curves(&self) -> &[PiecewiseCurve; NUM_CURVES] {
        &self.curves
    }

    #[inline]
    pub fn settings(&self) -> &BankSettings {
        &self.settings
    }

    /// Replace the scalar settings (clamped into range)
    pub fn set_settings(&mut self, settings: BankSettings) {
        self.settings = settings.clamped();
    }

    #[inline]
    pub fn lut(&self) -> &CurveLut {
        &self.lut
    }

    /// Rebuild stale lookup-table rows; returns the number rebuilt
    pub fn rebuild_lut(&mut self, sample_rate: f32, num_bins: usize) -> usize {
        self.lut.rebuild(&self.curves, sample_rate, num_bins)
    }

    /// Restore identity curves and default settings
    pub fn reset(&mut self) {
        for (curve, kind) in self.curves.iter_mut().zip(CurveKind::ALL) {
            curve.reset(kind.identity());
        }
        self.settings = BankSettings::default();
    }

    /// Take over another bank's curves and settings
    ///
    /// Curve versions are bumped, never copied, so this bank's lookup table
    /// always notices the change.
    pub fn copy_from(&mut self, other: &ParameterBank) {
        for (curve, src) in self.curves.iter_mut().zip(other.curves.iter()) {
            curve.copy_from(src);
        }
        self.settings = other.settings;
    }

    /// Copy one side's curves and delay settings onto the other side
    pub fn copy_channel(&mut self, from: Channel) {
        for family in CurveFamily::ALL {
            let src = family.curve(from).index();
            let dst = family.curve(from.other()).index();
            let points = self.curves[src].clone();
            self.curves[dst].copy_from(&points);
        }
        let (src, dst) = (from.index(), from.other().index());
        self.settings.delay_max_ms[dst] = self.settings.delay_max_ms[src];
        self.settings.delay_log_scale[dst] = self.settings.delay_log_scale[src];
    }

    /// True when the curve is flat at its identity value
    #[inline]
    pub fn is_identity(&self, kind: CurveKind) -> bool {
        self.curve(kind).is_flat(kind.identity(), FLAT_TOLERANCE)
    }

    /// Larger of the two per-channel delay ranges (ms)
    pub fn max_delay_ms(&self) -> f32 {
        self.settings.delay_max_ms[0].max(self.settings.delay_max_ms[1])
    }

    /// Add a point given in physical units
    ///
    /// `freq_hz` must lie in [20 Hz, Nyquist] and `value` in the curve's
    /// entry range (ms, dB, Hz, factor...). Refused entries leave the curve
    /// untouched. Returns the new point's index.
    pub fn add_point_physical(
        &mut self,
        kind: CurveKind,
        freq_hz: f32,
        value: f32,
        sample_rate: f32,
    ) -> Result<usize, CurveEditError> {
        let nyquist = sample_rate * 0.5;
        if !(freq_hz >= units::MIN_FREQUENCY_HZ && freq_hz <= nyquist) {
            return Err(CurveEditError::FrequencyOutOfRange { freq_hz, nyquist });
        }

        let channel = kind.channel().index();
        let max_ms = self.settings.delay_max_ms[channel];
        let (min, max) = units::entry_range(kind, max_ms);
        if !(value >= min && value <= max) {
            return Err(CurveEditError::ValueOutOfRange {
                kind,
                value,
                min,
                max,
            });
        }

        let x = units::frequency_to_normalized(freq_hz, sample_rate);
        let y = units::physical_to_normalized(
            kind,
            value,
            max_ms,
            self.settings.delay_log_scale[channel],
        )
        .clamp(0.0, 1.0);
        Ok(self.curve_mut(kind).add_point(x, y))
    }
}

impl Default for ParameterBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bank_is_identity() {
        let bank = ParameterBank::new();
        for kind in CurveKind::ALL {
            assert!(bank.is_identity(kind), "{:?} should start at identity", kind);
        }
        assert_eq!(*bank.settings(), BankSettings::default());
        assert!(bank.settings().shift_before_multiply);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut bank = ParameterBank::new();
        bank.curve_mut(CurveKind::PanL).add_point(0.5, 1.0);
        bank.set_settings(BankSettings {
            gain_db: -6.0,
            ..BankSettings::default()
        });
        bank.reset();
        assert!(bank.is_identity(CurveKind::PanL));
        assert_eq!(bank.settings().gain_db, 0.0);
    }

    #[test]
    fn test_copy_from_bumps_versions() {
        let mut a = ParameterBank::new();
        let mut b = ParameterBank::new();
        a.curve_mut(CurveKind::DelayL).add_point(0.3, 0.7);
        b.rebuild_lut(48000.0, 1024);
        let before = b.curve(CurveKind::DelayR).version();
        b.copy_from(&a);
        assert_eq!(b.curve(CurveKind::DelayL).points(), a.curve(CurveKind::DelayL).points());
        assert!(b.curve(CurveKind::DelayR).version() > before);
        assert_eq!(b.rebuild_lut(48000.0, 1024), NUM_CURVES);
        assert!((b.lut().value(CurveKind::DelayL, 512) - b.curve(CurveKind::DelayL).evaluate(
            units::frequency_to_normalized(units::bin_frequency(512, 48000.0, 2048), 48000.0)
        ))
        .abs()
            < 1e-6);
    }

    #[test]
    fn test_copy_channel_left_to_right() {
        let mut bank = ParameterBank::new();
        for family in CurveFamily::ALL {
            bank.curve_mut(family.curve(Channel::Left)).add_point(0.4, 0.9);
        }
        bank.set_settings(BankSettings {
            delay_max_ms: [250.0, 1000.0],
            delay_log_scale: [true, false],
            gain_db: 3.0,
            ..BankSettings::default()
        });

        bank.copy_channel(Channel::Left);

        for family in CurveFamily::ALL {
            assert_eq!(
                bank.curve(family.curve(Channel::Right)).points(),
                bank.curve(family.curve(Channel::Left)).points()
            );
        }
        assert_eq!(bank.settings().delay_max_ms, [250.0, 250.0]);
        assert_eq!(bank.settings().delay_log_scale, [true, true]);
        assert_eq!(bank.settings().gain_db, 3.0, "non-channel settings untouched");
    }

    #[test]
    fn test_settings_clamped() {
        let mut bank = ParameterBank::new();
        bank.set_settings(BankSettings {
            gain_db: 40.0,
            soft_clip_threshold_db: -90.0,
            pan: 3.0,
            delay_max_ms: [0.0, 1e9],
            ..BankSettings::default()
        });
        let s = bank.settings();
        assert_eq!(s.gain_db, 12.0);
        assert_eq!(s.soft_clip_threshold_db, -20.0);
        assert_eq!(s.pan, 1.0);
        assert_eq!(s.delay_max_ms, [1.0, 99000.0]);
    }

    #[test]
    fn test_add_point_physical_refuses_out_of_range() {
        let mut bank = ParameterBank::new();
        let version = bank.curve(CurveKind::FeedbackL).version();

        let err = bank.add_point_physical(CurveKind::FeedbackL, 10.0, -12.0, 48000.0);
        assert!(matches!(err, Err(CurveEditError::FrequencyOutOfRange { .. })));
        let err = bank.add_point_physical(CurveKind::FeedbackL, 30000.0, -12.0, 48000.0);
        assert!(matches!(err, Err(CurveEditError::FrequencyOutOfRange { .. })));
        let err = bank.add_point_physical(CurveKind::FeedbackL, 440.0, 12.0, 48000.0);
        assert!(matches!(err, Err(CurveEditError::ValueOutOfRange { .. })));
        let err = bank.add_point_physical(CurveKind::DelayL, 440.0, 1500.0, 48000.0);
        assert!(matches!(err, Err(CurveEditError::ValueOutOfRange { .. })));
        let err = bank.add_point_physical(CurveKind::MultiplyR, 440.0, 0.05, 48000.0);
        assert!(matches!(err, Err(CurveEditError::ValueOutOfRange { .. })));

        assert_eq!(bank.curve(CurveKind::FeedbackL).version(), version);
        assert_eq!(bank.curve(CurveKind::FeedbackL).len(), 2);
    }

    #[test]
    fn test_add_point_physical_accepts_in_range() {
        let mut bank = ParameterBank::new();
        let idx = bank
            .add_point_physical(CurveKind::DelayR, 1000.0, 500.0, 48000.0)
            .expect("in-range point");
        let point = bank.curve(CurveKind::DelayR).points()[idx];
        assert!((point.y - 0.5).abs() < 1e-6);
        assert!((point.x - units::frequency_to_normalized(1000.0, 48000.0)).abs() < 1e-6);

        // Dynamics above 0 dB are accepted but clamp to the top of the curve
        let idx = bank
            .add_point_physical(CurveKind::PreGainL, 1000.0, 24.0, 48000.0)
            .expect("in-range point");
        assert_eq!(bank.curve(CurveKind::PreGainL).points()[idx].y, 1.0);
    }
}
