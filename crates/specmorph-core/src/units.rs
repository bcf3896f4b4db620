//! Normalized ↔ physical unit conversions
//!
//! Curves store normalized values. These helpers turn them into the
//! physical quantities the spectral frame works with, and back again for
//! numerically entered points:
//!
//! | Family    | Normalized y → physical                  |
//! |-----------|------------------------------------------|
//! | Delay     | `max^y` ms (log) or `y·max` ms (linear)  |
//! | Pan       | passthrough, 0 = same side, 1 = opposite |
//! | Feedback  | `y·66 − 60` dB, y ≤ 0 → silence          |
//! | Dynamics  | `y·60 − 60` dB, y ≤ 0 → silence          |
//! | Shift     | `(y − 0.5)·20000` Hz                     |
//! | Multiply  | `0.1·100^y` ×                            |
//!
//! X is log-frequency between 20 Hz and Nyquist.

use crate::types::{CurveFamily, CurveKind};

/// Lowest frequency on the curve x axis
pub const MIN_FREQUENCY_HZ: f32 = 20.0;

/// Feedback curve floor in dB (y = 0)
pub const FEEDBACK_FLOOR_DB: f32 = -60.0;

/// Feedback curve ceiling in dB (y = 1)
pub const FEEDBACK_CEILING_DB: f32 = 6.0;

/// Dynamics curve floor in dB (y = 0); y = 1 is 0 dB
pub const DYNAMICS_FLOOR_DB: f32 = -60.0;

/// Highest dynamics value accepted by numeric point entry
pub const DYNAMICS_ENTRY_MAX_DB: f32 = 48.0;

/// Full shift range in Hz (±half of this)
pub const SHIFT_RANGE_HZ: f32 = 20000.0;

/// Smallest multiply factor (y = 0)
pub const MULTIPLY_MIN: f32 = 0.1;

/// Largest multiply factor (y = 1)
pub const MULTIPLY_MAX: f32 = 10.0;

// ────────────────────────────────────────────────────────────────────
// Frequency axis
// ────────────────────────────────────────────────────────────────────

/// Centre frequency of an FFT bin
#[inline]
pub fn bin_frequency(bin: usize, sample_rate: f32, fft_size: usize) -> f32 {
    bin as f32 * sample_rate / fft_size as f32
}

/// Map a frequency to the curve x axis (log scale, 20 Hz → 0, Nyquist → 1)
///
/// Frequencies below 20 Hz map to 0.
pub fn frequency_to_normalized(freq_hz: f32, sample_rate: f32) -> f32 {
    let nyquist = sample_rate * 0.5;
    if freq_hz < MIN_FREQUENCY_HZ || nyquist <= MIN_FREQUENCY_HZ {
        return 0.0;
    }
    let log_min = MIN_FREQUENCY_HZ.log10();
    let span = nyquist.log10() - log_min;
    ((freq_hz.log10() - log_min) / span).clamp(0.0, 1.0)
}

/// Inverse of [`frequency_to_normalized`]
pub fn normalized_to_frequency(x: f32, sample_rate: f32) -> f32 {
    let nyquist = sample_rate * 0.5;
    MIN_FREQUENCY_HZ * (nyquist / MIN_FREQUENCY_HZ).powf(x.clamp(0.0, 1.0))
}

// ────────────────────────────────────────────────────────────────────
// Gain
// ────────────────────────────────────────────────────────────────────

/// dB to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Feedback curve value to linear gain (y ≤ 0 is exactly 0)
#[inline]
pub fn feedback_gain(y: f32) -> f32 {
    if y <= 0.0 {
        return 0.0;
    }
    db_to_linear(y * (FEEDBACK_CEILING_DB - FEEDBACK_FLOOR_DB) + FEEDBACK_FLOOR_DB)
}

/// Dynamics curve value (pre-gain, gate, clip) to linear gain (y ≤ 0 is exactly 0)
#[inline]
pub fn dynamics_gain(y: f32) -> f32 {
    if y <= 0.0 {
        return 0.0;
    }
    db_to_linear(y * -DYNAMICS_FLOOR_DB + DYNAMICS_FLOOR_DB)
}

pub fn feedback_db_to_normalized(db: f32) -> f32 {
    (db - FEEDBACK_FLOOR_DB) / (FEEDBACK_CEILING_DB - FEEDBACK_FLOOR_DB)
}

pub fn dynamics_db_to_normalized(db: f32) -> f32 {
    (db - DYNAMICS_FLOOR_DB) / -DYNAMICS_FLOOR_DB
}

// ────────────────────────────────────────────────────────────────────
// Delay
// ────────────────────────────────────────────────────────────────────

/// Delay curve value to milliseconds
///
/// Log scale maps y onto `max_ms^y`, so y = 0 is 1 ms rather than 0.
#[inline]
pub fn delay_ms(y: f32, max_ms: f32, log_scale: bool) -> f32 {
    if log_scale {
        max_ms.powf(y)
    } else {
        y * max_ms
    }
}

/// Milliseconds to delay curve value
pub fn delay_ms_to_normalized(ms: f32, max_ms: f32, log_scale: bool) -> f32 {
    if max_ms <= 0.0 {
        return 0.0;
    }
    if log_scale && max_ms > 1.0 {
        ms.max(1.0).ln() / max_ms.ln()
    } else {
        ms / max_ms
    }
}

/// Milliseconds to samples
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms / 1000.0 * sample_rate
}

/// Number of hop frames needed to hold `max_ms` of delay, plus the
/// write slot
pub fn delay_capacity_frames(max_ms: f32, sample_rate: f32, hop_size: usize) -> usize {
    let frames = (ms_to_samples(max_ms.max(0.0), sample_rate) / hop_size.max(1) as f32).ceil();
    frames as usize + 1
}

// ────────────────────────────────────────────────────────────────────
// Shift / multiply
// ────────────────────────────────────────────────────────────────────

/// Shift curve value to Hz (0.5 → 0 Hz)
#[inline]
pub fn shift_hz(y: f32) -> f32 {
    (y - 0.5) * SHIFT_RANGE_HZ
}

pub fn shift_hz_to_normalized(hz: f32) -> f32 {
    hz / SHIFT_RANGE_HZ + 0.5
}

/// Multiply curve value to factor (0.5 → ×1)
#[inline]
pub fn multiply_factor(y: f32) -> f32 {
    MULTIPLY_MIN * (MULTIPLY_MAX / MULTIPLY_MIN).powf(y)
}

pub fn multiply_factor_to_normalized(factor: f32) -> f32 {
    (factor / MULTIPLY_MIN).log10() / (MULTIPLY_MAX / MULTIPLY_MIN).log10()
}

// ────────────────────────────────────────────────────────────────────
// Numeric point entry
// ────────────────────────────────────────────────────────────────────

/// Physical range a numerically entered value must fall in
///
/// Delay ranges depend on the bank's configured maximum for the curve's
/// channel, so it is passed in.
pub fn entry_range(kind: CurveKind, delay_max_ms: f32) -> (f32, f32) {
    match kind.family() {
        CurveFamily::Delay => (0.0, delay_max_ms),
        CurveFamily::Pan => (0.0, 1.0),
        CurveFamily::Feedback => (FEEDBACK_FLOOR_DB, FEEDBACK_CEILING_DB),
        CurveFamily::PreGain | CurveFamily::MinGate | CurveFamily::MaxClip => {
            (DYNAMICS_FLOOR_DB, DYNAMICS_ENTRY_MAX_DB)
        }
        CurveFamily::Shift => (-SHIFT_RANGE_HZ * 0.5, SHIFT_RANGE_HZ * 0.5),
        CurveFamily::Multiply => (MULTIPLY_MIN, MULTIPLY_MAX),
    }
}

/// Convert an entered physical value to a curve value (unclamped)
pub fn physical_to_normalized(
    kind: CurveKind,
    value: f32,
    delay_max_ms: f32,
    delay_log_scale: bool,
) -> f32 {
    match kind.family() {
        CurveFamily::Delay => delay_ms_to_normalized(value, delay_max_ms, delay_log_scale),
        CurveFamily::Pan => value,
        CurveFamily::Feedback => feedback_db_to_normalized(value),
        CurveFamily::PreGain | CurveFamily::MinGate | CurveFamily::MaxClip => {
            dynamics_db_to_normalized(value)
        }
        CurveFamily::Shift => shift_hz_to_normalized(value),
        CurveFamily::Multiply => multiply_factor_to_normalized(value),
    }
}
