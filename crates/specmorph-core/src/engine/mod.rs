//! Real-time engine and its control handle
//!
//! - [`SpectralEngine`]: owned by the audio thread, processes blocks
//! - [`EngineController`]: owned by the control thread, edits banks and settings
//! - [`SharedState`]: what both sides see (bank mutex, atomics, spectrograph)
//!
//! ```ignore
//! let (mut engine, mut controller) = create_engine(EngineConfig::default())?;
//!
//! // control thread
//! controller.set_delay_max_ms(0, Channel::Left, 500.0)?;
//! controller.set_morph(0.5, 0.0);
//!
//! // audio thread
//! engine.process(&mut buffer);
//! ```

pub mod command;
mod controller;
mod engine;
pub mod gc;
pub mod output;
pub mod overlap_add;
mod shared;

pub use command::{command_channel, EngineCommand, COMMAND_QUEUE_CAPACITY};
pub use controller::EngineController;
pub use engine::SpectralEngine;
pub use output::{LevelMeter, MasterSettings, OutputStage};
pub use overlap_add::OverlapAdd;
pub use shared::{AtomicF32, SharedState};

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Build a connected engine/controller pair
pub fn create_engine(config: EngineConfig) -> EngineResult<(SpectralEngine, EngineController)> {
    let (tx, rx) = command_channel();
    let shared = Arc::new(SharedState::new());
    let engine = SpectralEngine::new(config.clone(), Arc::clone(&shared), rx)?;
    let controller = EngineController::new(shared, tx, &config);
    Ok((engine, controller))
}
