//! Specmorph Core - Stereo STFT spectral effects with four morphable banks
//!
//! Each FFT bin of each channel gets its own delay, crossfeed pan, feedback,
//! gain/gate/clip and frequency shift/multiply, all drawn as curves over
//! frequency. Four complete curve banks sit on the corners of a morph pad
//! and are blended per bin.
//!
//! - [`curve`], [`bank`], [`morph`]: authoring model
//! - [`spectral`]: per-frame bin transform
//! - [`engine`]: real-time processor, control handle, overlap-add framing
//! - [`state`], [`config`]: presets and engine configuration

pub mod bank;
pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod morph;
pub mod observe;
pub mod spectral;
pub mod state;
pub mod types;
pub mod units;

pub use engine::{create_engine, EngineController, SpectralEngine};
pub use error::{CurveEditError, EngineError, EngineResult, StateError, StateResult};
pub use types::*;
