//! Control-thread handle to a running engine
//!
//! Every edit the UI (or a preset load) makes goes through here:
//! - curve and bank edits take the bank lock briefly
//! - scalar settings are stored into atomics
//! - edits that raise the delay range allocate larger delay lines here,
//!   off the audio thread, and send them over the command queue

use std::sync::Arc;

use basedrop::Owned;

use super::command::EngineCommand;
use super::gc::gc_handle;
use super::output::{MASTER_CLIP_RANGE_DB, MASTER_GAIN_RANGE_DB};
use super::shared::SharedState;
use crate::bank::{BankSettings, ParameterBank};
use crate::config::EngineConfig;
use crate::curve::PiecewiseCurve;
use crate::error::{EngineError, EngineResult};
use crate::morph::MorphPosition;
use crate::spectral::{BinDelayLines, SpectrographFrame};
use crate::state::{BankState, EngineState, ViewState, STATE_VERSION};
use crate::types::{Channel, CurveKind, NUM_BANKS};
use crate::units;

/// Delay capacity (frames) needed to cover every bank's delay range
pub(crate) fn required_delay_capacity(
    banks: &[ParameterBank; NUM_BANKS],
    sample_rate: f32,
    hop_size: usize,
) -> usize {
    let max_ms = banks
        .iter()
        .map(ParameterBank::max_delay_ms)
        .fold(0.0, f32::max);
    units::delay_capacity_frames(max_ms, sample_rate, hop_size)
}

/// Control-side handle; pairs with one [`SpectralEngine`](super::SpectralEngine)
pub struct EngineController {
    shared: Arc<SharedState>,
    commands: rtrb::Producer<EngineCommand>,
    sample_rate: f32,
    hop_size: usize,
    num_bins: usize,
    view: ViewState,
}

impl EngineController {
    pub fn new(
        shared: Arc<SharedState>,
        commands: rtrb::Producer<EngineCommand>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            shared,
            commands,
            sample_rate: config.sample_rate,
            hop_size: config.hop_size(),
            num_bins: config.num_bins(),
            view: ViewState::default(),
        }
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn check_bank(bank: usize) -> EngineResult<()> {
        if bank < NUM_BANKS {
            Ok(())
        } else {
            Err(EngineError::BankOutOfRange(bank))
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Bank access
    // ─────────────────────────────────────────────────────────────────

    /// Read a bank under the lock
    pub fn with_bank<R>(&self, bank: usize, f: impl FnOnce(&ParameterBank) -> R) -> EngineResult<R> {
        Self::check_bank(bank)?;
        let banks = self.shared.banks();
        Ok(f(&banks[bank]))
    }

    /// Mutate a bank under the lock
    ///
    /// Delay capacity is re-checked afterwards.
    pub fn with_bank_mut<R>(
        &mut self,
        bank: usize,
        f: impl FnOnce(&mut ParameterBank) -> R,
    ) -> EngineResult<R> {
        Self::check_bank(bank)?;
        let result = {
            let mut banks = self.shared.banks();
            f(&mut banks[bank])
        };
        self.ensure_delay_capacity()?;
        Ok(result)
    }

    /// Edit one curve of a bank
    pub fn edit_curve<R>(
        &self,
        bank: usize,
        kind: CurveKind,
        f: impl FnOnce(&mut PiecewiseCurve) -> R,
    ) -> EngineResult<R> {
        Self::check_bank(bank)?;
        let mut banks = self.shared.banks();
        Ok(f(banks[bank].curve_mut(kind)))
    }

    /// Add a point given in physical units (Hz and ms/dB/Hz/factor)
    pub fn add_point_physical(
        &self,
        bank: usize,
        kind: CurveKind,
        freq_hz: f32,
        value: f32,
    ) -> EngineResult<usize> {
        Self::check_bank(bank)?;
        let mut banks = self.shared.banks();
        Ok(banks[bank].add_point_physical(kind, freq_hz, value, self.sample_rate)?)
    }

    /// Detached copy of a bank (for a clipboard)
    pub fn copy_bank(&self, bank: usize) -> EngineResult<ParameterBank> {
        self.with_bank(bank, |b| b.clone())
    }

    /// Replace a bank's curves and settings with `source`'s
    pub fn paste_bank(&mut self, bank: usize, source: &ParameterBank) -> EngineResult<()> {
        self.with_bank_mut(bank, |b| b.copy_from(source))?;
        log::debug!("Pasted into bank {}", bank);
        Ok(())
    }

    pub fn reset_bank(&mut self, bank: usize) -> EngineResult<()> {
        self.with_bank_mut(bank, ParameterBank::reset)
    }

    /// Copy one channel's curves and delay settings onto the other channel
    pub fn copy_channel(&mut self, bank: usize, from: Channel) -> EngineResult<()> {
        self.with_bank_mut(bank, |b| b.copy_channel(from))
    }

    fn update_settings(
        &mut self,
        bank: usize,
        f: impl FnOnce(&mut BankSettings),
    ) -> EngineResult<()> {
        self.with_bank_mut(bank, |b| {
            let mut settings = *b.settings();
            f(&mut settings);
            b.set_settings(settings);
        })
    }

    /// Set a channel's delay range; grows the delay lines if needed
    pub fn set_delay_max_ms(&mut self, bank: usize, channel: Channel, ms: f32) -> EngineResult<()> {
        self.update_settings(bank, |s| s.delay_max_ms[channel.index()] = ms)
    }

    pub fn set_delay_log_scale(&mut self, bank: usize, channel: Channel, log_scale: bool) -> EngineResult<()> {
        self.update_settings(bank, |s| s.delay_log_scale[channel.index()] = log_scale)
    }

    pub fn set_bank_gain_db(&mut self, bank: usize, db: f32) -> EngineResult<()> {
        self.update_settings(bank, |s| s.gain_db = db)
    }

    pub fn set_bank_soft_clip_db(&mut self, bank: usize, db: f32) -> EngineResult<()> {
        self.update_settings(bank, |s| s.soft_clip_threshold_db = db)
    }

    pub fn set_bank_pan(&mut self, bank: usize, pan: f32) -> EngineResult<()> {
        self.update_settings(bank, |s| s.pan = pan)
    }

    pub fn set_shift_before_multiply(&mut self, bank: usize, shift_first: bool) -> EngineResult<()> {
        self.update_settings(bank, |s| s.shift_before_multiply = shift_first)
    }

    // ─────────────────────────────────────────────────────────────────
    // Morph and master section
    // ─────────────────────────────────────────────────────────────────

    pub fn set_morph(&self, x: f32, y: f32) {
        self.shared.set_morph_position(MorphPosition::new(x, y));
    }

    pub fn morph_position(&self) -> MorphPosition {
        self.shared.morph_position()
    }

    pub fn set_master_gain_db(&self, db: f32) {
        self.shared
            .set_master_gain_db(db.clamp(MASTER_GAIN_RANGE_DB.0, MASTER_GAIN_RANGE_DB.1));
    }

    pub fn set_master_clip_db(&self, db: f32) {
        self.shared
            .set_master_clip_db(db.clamp(MASTER_CLIP_RANGE_DB.0, MASTER_CLIP_RANGE_DB.1));
    }

    /// 0 = dry only, 1 = wet only
    pub fn set_dry_wet(&self, amount: f32) {
        self.shared.set_dry_wet(amount.clamp(0.0, 1.0));
    }

    /// Select the bank shown for editing
    pub fn set_active_bank(&self, bank: usize) -> EngineResult<()> {
        Self::check_bank(bank)?;
        self.shared.set_active_bank(bank);
        Ok(())
    }

    pub fn active_bank(&self) -> usize {
        self.shared.active_bank()
    }

    // ─────────────────────────────────────────────────────────────────
    // Editor state and readouts
    // ─────────────────────────────────────────────────────────────────

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Latest published spectrograph frame
    pub fn spectrograph_snapshot(&self) -> SpectrographFrame {
        self.shared.spectrograph().snapshot()
    }

    /// Smoothed output peaks (L, R)
    pub fn output_levels(&self) -> [f32; 2] {
        self.shared.output_levels()
    }

    /// Clear every delayed and fed-back signal at the next block
    pub fn reset(&mut self) -> EngineResult<()> {
        self.commands
            .push(EngineCommand::Reset)
            .map_err(|_| EngineError::CommandQueueFull)
    }

    // ─────────────────────────────────────────────────────────────────
    // Persisted state
    // ─────────────────────────────────────────────────────────────────

    /// Apply a loaded document
    ///
    /// Banks present in the document are replaced; banks beyond its length
    /// and absent top-level fields are left as they are.
    pub fn load_state(&mut self, state: &EngineState) -> EngineResult<()> {
        {
            let mut banks = self.shared.banks();
            for (bank, stored) in banks.iter_mut().zip(state.bank_states()) {
                if let Some(stored) = stored {
                    stored.apply_to(bank);
                }
            }
        }

        if state.morph_x.is_some() || state.morph_y.is_some() {
            let current = self.shared.morph_position();
            self.set_morph(
                state.morph_x.unwrap_or(current.x),
                state.morph_y.unwrap_or(current.y),
            );
        }
        if let Some(bank) = state.active_bank_index {
            self.shared.set_active_bank(bank.min(NUM_BANKS - 1));
        }
        if let Some(db) = state.master_gain_db {
            self.set_master_gain_db(db);
        }
        if let Some(db) = state.master_clip_db {
            self.set_master_clip_db(db);
        }
        if let Some(amount) = state.master_dry_wet {
            self.set_dry_wet(amount);
        }
        state.merge_view(&mut self.view);

        let skipped = state.bank_states().iter().filter(|b| b.is_none()).count();
        if skipped > 0 {
            log::warn!("Skipped {} malformed bank entries", skipped);
        }
        log::info!(
            "Loaded state (version {}, {} banks)",
            state.version.as_deref().unwrap_or("unknown"),
            state.bank_states().len() - skipped
        );
        self.ensure_delay_capacity()?;
        Ok(())
    }

    /// Capture the complete current state
    pub fn snapshot_state(&self) -> EngineState {
        let banks = {
            let banks = self.shared.banks();
            banks.iter().map(|b| Some(BankState::from_bank(b))).collect()
        };
        let morph = self.shared.morph_position();
        let master = self.shared.master_settings();

        let mut state = EngineState {
            version: Some(STATE_VERSION.to_string()),
            banks: Some(banks),
            morph_x: Some(morph.x),
            morph_y: Some(morph.y),
            active_bank_index: Some(self.shared.active_bank()),
            master_gain_db: Some(master.gain_db),
            master_clip_db: Some(master.clip_db),
            master_dry_wet: Some(master.dry_wet),
            ..Default::default()
        };
        state.set_view(&self.view);
        state
    }

    // ─────────────────────────────────────────────────────────────────
    // Delay capacity
    // ─────────────────────────────────────────────────────────────────

    /// Make sure the engine's delay lines cover every bank's delay range
    ///
    /// Allocates here and sends the new lines to the audio thread. Capacity
    /// only ever grows. Returns true if new lines were sent.
    pub fn ensure_delay_capacity(&mut self) -> EngineResult<bool> {
        let required = {
            let banks = self.shared.banks();
            required_delay_capacity(&banks, self.sample_rate, self.hop_size)
        };
        let current = self.shared.delay_capacity_frames();
        if required <= current {
            return Ok(false);
        }

        let lines = Owned::new(&gc_handle(), BinDelayLines::new(self.num_bins, required));
        self.commands
            .push(EngineCommand::SwapDelayLines(lines))
            .map_err(|_| EngineError::CommandQueueFull)?;
        self.shared.set_delay_capacity_frames(required);

        log::info!(
            "Delay capacity {} -> {} frames ({} bins)",
            current,
            required,
            self.num_bins
        );
        Ok(true)
    }
}
