//! Persisted engine state
//!
//! The document is a JSON object with camelCase keys:
//!
//! ```text
//! { "version": "1.0", "banks": [ {...}, ... ], "morphX": 0.5, "morphY": 0.0,
//!   "activeBankIndex": 0, "masterGainDB": 0.0, "masterClipDB": 0.0,
//!   "masterDryWet": 1.0, "notesText": "", "dynamicsLCurveIndex": 0, ...,
//!   "zoom": { "left": {...}, "right": {...} } }
//! ```
//!
//! Loading is lenient: every field is optional, and a field with the wrong
//! type is treated as absent. A malformed entry in `banks` skips only that
//! bank; the others still load in order. Absent bank fields take their defaults;
//! absent top-level fields leave the engine's current value untouched.

mod io;

pub use io::{from_json, load_preset, preset_path, save_preset, to_json, PRESET_EXTENSION};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bank::{BankSettings, ParameterBank};
use crate::curve::ControlPoint;
use crate::types::{Channel, CurveKind, NUM_BANKS};

/// Version string written into new documents
pub const STATE_VERSION: &str = "1.0";

/// Number of selectable dynamics curves per channel (pre-gain, min gate, max clip)
pub const DYNAMICS_CURVE_COUNT: usize = 3;

/// Number of selectable shift curves per channel (shift, multiply)
pub const SHIFT_CURVE_COUNT: usize = 2;

/// Field (de)serializer that maps wrong-typed values to `None`
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).ok())
    }
}

/// Bank array (de)serializer that drops malformed entries one by one
mod lenient_banks {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::BankState;

    pub fn serialize<S>(value: &Option<Vec<Option<BankState>>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<Option<BankState>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let serde_json::Value::Array(entries) = value else {
            return Ok(None);
        };
        Ok(Some(
            entries
                .into_iter()
                .map(|entry| serde_json::from_value(entry).ok())
                .collect(),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Curves and banks
// ─────────────────────────────────────────────────────────────────────────

/// A curve as stored: `{ "points": [[x, y], ...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveState {
    #[serde(default)]
    pub points: Vec<[f32; 2]>,
}

impl CurveState {
    pub fn from_points(points: &[ControlPoint]) -> Self {
        Self {
            points: points.iter().map(|p| [p.x, p.y]).collect(),
        }
    }

    /// Finite points as control points
    pub fn control_points(&self) -> Vec<ControlPoint> {
        self.points
            .iter()
            .filter(|[x, y]| x.is_finite() && y.is_finite())
            .map(|&[x, y]| ControlPoint::new(x, y))
            .collect()
    }
}

/// One bank as stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankState {
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub delay_max_time_ms_l: Option<f32>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub delay_max_time_ms_r: Option<f32>,
    /// Older documents carry one delay range for both channels
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub delay_max_time_ms: Option<f32>,

    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub delay_log_scale_l: Option<bool>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub delay_log_scale_r: Option<bool>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub delay_log_scale: Option<bool>,

    #[serde(
        rename = "gainDB",
        default,
        with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub gain_db: Option<f32>,
    #[serde(
        rename = "softClipThresholdDB",
        default,
        with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub soft_clip_threshold_db: Option<f32>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub pan_value: Option<f32>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub shift_before_multiply: Option<bool>,

    /// Curves keyed `delayL` .. `multiplyR`; unknown keys are kept but ignored
    #[serde(flatten)]
    pub curves: BTreeMap<String, serde_json::Value>,
}

impl BankState {
    /// Capture a bank's curves and settings
    pub fn from_bank(bank: &ParameterBank) -> Self {
        let s = bank.settings();
        let curves = CurveKind::ALL
            .iter()
            .filter_map(|&kind| {
                serde_json::to_value(CurveState::from_points(bank.curve(kind).points()))
                    .ok()
                    .map(|v| (kind.key().to_string(), v))
            })
            .collect();
        Self {
            delay_max_time_ms_l: Some(s.delay_max_ms[0]),
            delay_max_time_ms_r: Some(s.delay_max_ms[1]),
            delay_max_time_ms: None,
            delay_log_scale_l: Some(s.delay_log_scale[0]),
            delay_log_scale_r: Some(s.delay_log_scale[1]),
            delay_log_scale: None,
            gain_db: Some(s.gain_db),
            soft_clip_threshold_db: Some(s.soft_clip_threshold_db),
            pan_value: Some(s.pan),
            shift_before_multiply: Some(s.shift_before_multiply),
            curves,
        }
    }

    /// Stored curve for `kind`, if present and well-formed
    pub fn curve(&self, kind: CurveKind) -> Option<CurveState> {
        let value = self.curves.get(kind.key())?;
        CurveState::deserialize(value).ok()
    }

    /// Settings with absent fields at their defaults
    pub fn settings(&self) -> BankSettings {
        let d = BankSettings::default();
        let delay_max = |side: Option<f32>, ch: Channel| {
            side.or(self.delay_max_time_ms)
                .unwrap_or(d.delay_max_ms[ch.index()])
        };
        let log_scale = |side: Option<bool>, ch: Channel| {
            side.or(self.delay_log_scale)
                .unwrap_or(d.delay_log_scale[ch.index()])
        };
        BankSettings {
            gain_db: self.gain_db.unwrap_or(d.gain_db),
            soft_clip_threshold_db: self.soft_clip_threshold_db.unwrap_or(d.soft_clip_threshold_db),
            pan: self.pan_value.unwrap_or(d.pan),
            delay_max_ms: [
                delay_max(self.delay_max_time_ms_l, Channel::Left),
                delay_max(self.delay_max_time_ms_r, Channel::Right),
            ],
            delay_log_scale: [
                log_scale(self.delay_log_scale_l, Channel::Left),
                log_scale(self.delay_log_scale_r, Channel::Right),
            ],
            shift_before_multiply: self.shift_before_multiply.unwrap_or(d.shift_before_multiply),
        }
        .clamped()
    }

    /// Reset `bank` and load this state into it
    pub fn apply_to(&self, bank: &mut ParameterBank) {
        bank.reset();
        for kind in CurveKind::ALL {
            if let Some(curve) = self.curve(kind) {
                bank.curve_mut(kind)
                    .set_points(&curve.control_points(), kind.identity());
            }
        }
        bank.set_settings(self.settings());
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Display state
// ─────────────────────────────────────────────────────────────────────────

/// Editor zoom ranges for one channel (display only)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoomRanges {
    /// dB (min, max) for the pre-gain, min-gate and max-clip views
    pub dynamics_db: [[f32; 2]; DYNAMICS_CURVE_COUNT],
    /// Hz (min, max) for the shift view
    pub shift_hz: [f32; 2],
    /// Factor (min, max) for the multiply view
    pub multiply: [f32; 2],
}

impl Default for ZoomRanges {
    fn default() -> Self {
        Self {
            dynamics_db: [[-60.0, 0.0]; DYNAMICS_CURVE_COUNT],
            shift_hz: [-500.0, 500.0],
            multiply: [0.5, 2.0],
        }
    }
}

/// Zoom ranges of both channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomState {
    pub left: ZoomRanges,
    pub right: ZoomRanges,
}

/// Editor state that rides along in presets without affecting audio
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub notes_text: String,
    /// Dynamics curve shown per channel, 0..3
    pub dynamics_curve_index: [usize; 2],
    /// Shift curve shown per channel, 0..2
    pub shift_curve_index: [usize; 2],
    pub zoom: ZoomState,
}

// ─────────────────────────────────────────────────────────────────────────
// Whole document
// ─────────────────────────────────────────────────────────────────────────

/// The complete persisted document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// One entry per bank; `None` marks an entry that failed to parse
    #[serde(default, with = "lenient_banks", skip_serializing_if = "Option::is_none")]
    pub banks: Option<Vec<Option<BankState>>>,

    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub morph_x: Option<f32>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub morph_y: Option<f32>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub active_bank_index: Option<usize>,

    #[serde(
        rename = "masterGainDB",
        default,
        with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub master_gain_db: Option<f32>,
    #[serde(
        rename = "masterClipDB",
        default,
        with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub master_clip_db: Option<f32>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub master_dry_wet: Option<f32>,

    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub notes_text: Option<String>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub dynamics_l_curve_index: Option<usize>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub dynamics_r_curve_index: Option<usize>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub shift_l_curve_index: Option<usize>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub shift_r_curve_index: Option<usize>,
    #[serde(default, with = "lenient", skip_serializing_if = "Option::is_none")]
    pub zoom: Option<ZoomState>,
}

impl EngineState {
    /// Stored bank entries by index, at most [`NUM_BANKS`]
    pub fn bank_states(&self) -> &[Option<BankState>] {
        match &self.banks {
            Some(banks) => &banks[..banks.len().min(NUM_BANKS)],
            None => &[],
        }
    }

    /// Editor state with absent fields defaulted and indices clamped
    pub fn view(&self) -> ViewState {
        let mut view = ViewState::default();
        self.merge_view(&mut view);
        view
    }

    /// Overwrite the editor fields present in this document
    pub fn merge_view(&self, view: &mut ViewState) {
        let dyn_max = DYNAMICS_CURVE_COUNT - 1;
        let shift_max = SHIFT_CURVE_COUNT - 1;
        if let Some(notes) = &self.notes_text {
            view.notes_text = notes.clone();
        }
        if let Some(i) = self.dynamics_l_curve_index {
            view.dynamics_curve_index[0] = i.min(dyn_max);
        }
        if let Some(i) = self.dynamics_r_curve_index {
            view.dynamics_curve_index[1] = i.min(dyn_max);
        }
        if let Some(i) = self.shift_l_curve_index {
            view.shift_curve_index[0] = i.min(shift_max);
        }
        if let Some(i) = self.shift_r_curve_index {
            view.shift_curve_index[1] = i.min(shift_max);
        }
        if let Some(zoom) = self.zoom {
            view.zoom = zoom;
        }
    }

    /// Store the editor state into this document
    pub fn set_view(&mut self, view: &ViewState) {
        self.notes_text = Some(view.notes_text.clone());
        self.dynamics_l_curve_index = Some(view.dynamics_curve_index[0]);
        self.dynamics_r_curve_index = Some(view.dynamics_curve_index[1]);
        self.shift_l_curve_index = Some(view.shift_curve_index[0]);
        self.shift_r_curve_index = Some(view.shift_curve_index[1]);
        self.zoom = Some(view.zoom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_round_trip() {
        let mut bank = ParameterBank::new();
        bank.curve_mut(CurveKind::FeedbackR).add_point(0.25, 0.8);
        bank.curve_mut(CurveKind::ShiftL).add_point(0.6, 0.9);
        bank.set_settings(BankSettings {
            gain_db: -3.0,
            pan: 0.25,
            delay_max_ms: [500.0, 2000.0],
            delay_log_scale: [true, false],
            shift_before_multiply: false,
            ..BankSettings::default()
        });

        let stored = BankState::from_bank(&bank);
        let mut restored = ParameterBank::new();
        stored.apply_to(&mut restored);

        for kind in CurveKind::ALL {
            assert_eq!(restored.curve(kind).points(), bank.curve(kind).points(), "{:?}", kind);
        }
        assert_eq!(restored.settings(), bank.settings());
    }

    #[test]
    fn test_bank_keys() {
        let json = serde_json::to_value(BankState::from_bank(&ParameterBank::new())).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "delayMaxTimeMsL",
            "delayLogScaleR",
            "gainDB",
            "softClipThresholdDB",
            "panValue",
            "shiftBeforeMultiply",
            "delayL",
            "multiplyR",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert!(!obj.contains_key("delayMaxTimeMs"));
        assert_eq!(obj["panL"]["points"][0][1], serde_json::json!(0.0));
    }

    #[test]
    fn test_legacy_delay_fields() {
        let stored: BankState =
            serde_json::from_str(r#"{ "delayMaxTimeMs": 250.0, "delayLogScale": true }"#).unwrap();
        let s = stored.settings();
        assert_eq!(s.delay_max_ms, [250.0, 250.0]);
        assert_eq!(s.delay_log_scale, [true, true]);

        let stored: BankState = serde_json::from_str(
            r#"{ "delayMaxTimeMs": 250.0, "delayMaxTimeMsR": 800.0 }"#,
        )
        .unwrap();
        assert_eq!(stored.settings().delay_max_ms, [250.0, 800.0]);
    }

    #[test]
    fn test_wrong_types_are_ignored() {
        let stored: BankState = serde_json::from_str(
            r#"{ "gainDB": "loud", "panValue": 0.5, "delayL": 12, "panR": { "points": [[0, 1], [1, 1]] } }"#,
        )
        .unwrap();
        assert_eq!(stored.gain_db, None);
        assert_eq!(stored.pan_value, Some(0.5));
        assert!(stored.curve(CurveKind::DelayL).is_none());

        let mut bank = ParameterBank::new();
        stored.apply_to(&mut bank);
        assert!(bank.is_identity(CurveKind::DelayL));
        assert_eq!(bank.curve(CurveKind::PanR).evaluate(0.5), 1.0);
        assert_eq!(bank.settings().gain_db, 0.0);
    }

    #[test]
    fn test_view_indices_clamped() {
        let state = EngineState {
            dynamics_l_curve_index: Some(7),
            shift_r_curve_index: Some(5),
            ..Default::default()
        };
        let view = state.view();
        assert_eq!(view.dynamics_curve_index, [2, 0]);
        assert_eq!(view.shift_curve_index, [0, 1]);
        assert_eq!(view.zoom, ZoomState::default());
    }

    #[test]
    fn test_extra_banks_ignored() {
        let state = EngineState {
            banks: Some(vec![Some(BankState::default()); 6]),
            ..Default::default()
        };
        assert_eq!(state.bank_states().len(), NUM_BANKS);
    }

    #[test]
    fn test_malformed_bank_skips_only_that_entry() {
        let state: EngineState =
            serde_json::from_str(r#"{ "banks": [ { "gainDB": -6.0 }, 42, {}, { "panValue": 0.5 } ] }"#)
                .unwrap();
        let banks = state.bank_states();
        assert_eq!(banks.len(), 4);
        assert_eq!(banks[0].as_ref().and_then(|b| b.gain_db), Some(-6.0));
        assert!(banks[1].is_none());
        assert!(banks[2].is_some());
        assert_eq!(banks[3].as_ref().and_then(|b| b.pan_value), Some(0.5));
    }
}
