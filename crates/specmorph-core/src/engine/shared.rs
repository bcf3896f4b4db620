//! State shared between the control thread and the audio thread
//!
//! - Banks sit behind a `parking_lot::Mutex`. The audio thread holds it only
//!   while snapshotting per-bin parameters, never across FFTs.
//! - Scalars (morph position, master section, meters) are lock-free f32
//!   atomics read once per block.
//! - The morph position is published as one packed `AtomicU64` so a reader
//!   never pairs a new X with an old Y.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::output::MasterSettings;
use crate::bank::ParameterBank;
use crate::morph::{MorphPosition, MorphWeights};
use crate::spectral::Spectrograph;
use crate::types::NUM_BANKS;

/// f32 stored as raw bits in an `AtomicU32`
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Two f32s (morph X in the high word, Y in the low word) in one `AtomicU64`
#[derive(Debug)]
struct AtomicMorph(AtomicU64);

impl AtomicMorph {
    fn new(position: MorphPosition) -> Self {
        Self(AtomicU64::new(Self::pack(position)))
    }

    #[inline]
    fn pack(position: MorphPosition) -> u64 {
        ((position.x.to_bits() as u64) << 32) | position.y.to_bits() as u64
    }

    #[inline]
    fn load(&self) -> MorphPosition {
        let bits = self.0.load(Ordering::Relaxed);
        MorphPosition::new(f32::from_bits((bits >> 32) as u32), f32::from_bits(bits as u32))
    }

    #[inline]
    fn store(&self, position: MorphPosition) {
        self.0.store(Self::pack(position), Ordering::Relaxed);
    }
}

/// Everything the control and audio threads both touch
#[derive(Debug)]
pub struct SharedState {
    banks: Mutex<[ParameterBank; NUM_BANKS]>,
    morph: AtomicMorph,
    master_gain_db: AtomicF32,
    master_clip_db: AtomicF32,
    dry_wet: AtomicF32,
    active_bank: AtomicUsize,
    meter_left: AtomicF32,
    meter_right: AtomicF32,
    /// Delay capacity (frames) the audio thread owns or has been sent
    delay_capacity_frames: AtomicUsize,
    spectrograph: Spectrograph,
}

impl SharedState {
    pub fn new() -> Self {
        let master = MasterSettings::default();
        Self {
            banks: Mutex::new(std::array::from_fn(|_| ParameterBank::new())),
            morph: AtomicMorph::new(MorphPosition::new(0.0, 0.0)),
            master_gain_db: AtomicF32::new(master.gain_db),
            master_clip_db: AtomicF32::new(master.clip_db),
            dry_wet: AtomicF32::new(master.dry_wet),
            active_bank: AtomicUsize::new(0),
            meter_left: AtomicF32::new(0.0),
            meter_right: AtomicF32::new(0.0),
            delay_capacity_frames: AtomicUsize::new(0),
            spectrograph: Spectrograph::new(),
        }
    }

    /// Lock the banks
    #[inline]
    pub fn banks(&self) -> parking_lot::MutexGuard<'_, [ParameterBank; NUM_BANKS]> {
        self.banks.lock()
    }

    pub fn morph_position(&self) -> MorphPosition {
        self.morph.load()
    }

    pub fn set_morph_position(&self, position: MorphPosition) {
        self.morph.store(position);
    }

    #[inline]
    pub fn morph_weights(&self) -> MorphWeights {
        self.morph_position().weights()
    }

    pub fn master_settings(&self) -> MasterSettings {
        MasterSettings {
            gain_db: self.master_gain_db.load(),
            clip_db: self.master_clip_db.load(),
            dry_wet: self.dry_wet.load(),
        }
    }

    pub fn set_master_gain_db(&self, db: f32) {
        self.master_gain_db.store(db);
    }

    pub fn set_master_clip_db(&self, db: f32) {
        self.master_clip_db.store(db);
    }

    pub fn set_dry_wet(&self, amount: f32) {
        self.dry_wet.store(amount);
    }

    /// Bank selected for editing (no effect on audio)
    pub fn active_bank(&self) -> usize {
        self.active_bank.load(Ordering::Relaxed)
    }

    pub fn set_active_bank(&self, bank: usize) {
        self.active_bank.store(bank, Ordering::Relaxed);
    }

    /// Smoothed output peaks (L, R)
    pub fn output_levels(&self) -> [f32; 2] {
        [self.meter_left.load(), self.meter_right.load()]
    }

    pub(crate) fn publish_levels(&self, levels: [f32; 2]) {
        self.meter_left.store(levels[0]);
        self.meter_right.store(levels[1]);
    }

    pub fn delay_capacity_frames(&self) -> usize {
        self.delay_capacity_frames.load(Ordering::Acquire)
    }

    pub(crate) fn set_delay_capacity_frames(&self, frames: usize) {
        self.delay_capacity_frames.store(frames, Ordering::Release);
    }

    #[inline]
    pub fn spectrograph(&self) -> &Spectrograph {
        &self.spectrograph
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
