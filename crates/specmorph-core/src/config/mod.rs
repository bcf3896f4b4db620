//! Configuration
//!
//! - [`EngineConfig`]: sample rate, FFT framing and processing switches
//! - `engine.yaml` loading (validated, defaults on failure) and saving
//! - Standard config and preset locations
//!
//! ```ignore
//! use specmorph_core::config::{load_config, default_config_path, EngineConfig};
//!
//! let config: EngineConfig = load_config(&default_config_path());
//! ```

mod engine;
mod io;
mod paths;

pub use engine::{EngineConfig, MAX_FFT_SIZE, MAX_OVERLAP_FACTOR, MIN_FFT_SIZE};
pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path, default_preset_dir};
