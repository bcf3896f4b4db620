//! Error types
//!
//! Errors only ever surface on control-thread entry points (configuration,
//! curve editing, state load/save). The audio path degrades to silence or
//! pass-through instead of returning errors.

use thiserror::Error;

use crate::types::CurveKind;

/// Errors from engine construction and control-thread commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// FFT size must be a power of two within the supported range
    #[error("Invalid FFT size {size}: must be a power of two between {min} and {max}")]
    InvalidFftSize { size: usize, min: usize, max: usize },

    /// Overlap factor must be a power of two and leave a hop of at least one sample
    #[error("Invalid overlap factor {overlap} for FFT size {fft_size}")]
    InvalidOverlap { overlap: usize, fft_size: usize },

    /// Sample rate must be positive and finite
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    /// Block size must be at least one sample
    #[error("Invalid max block size: {0}")]
    InvalidBlockSize(usize),

    /// Bank index outside 0..NUM_BANKS
    #[error("Bank index {0} out of range")]
    BankOutOfRange(usize),

    /// Audio thread is not draining commands fast enough
    #[error("Engine command queue is full")]
    CommandQueueFull,

    /// A curve edit was refused
    #[error(transparent)]
    CurveEdit(#[from] CurveEditError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Reasons a curve edit is refused
///
/// A refused edit leaves the curve (and its version) untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveEditError {
    /// Entered frequency is outside [20 Hz, Nyquist]
    #[error("Frequency {freq_hz} Hz outside 20 Hz..{nyquist} Hz")]
    FrequencyOutOfRange { freq_hz: f32, nyquist: f32 },

    /// Entered value is outside the curve's display domain
    #[error("Value {value} outside {min}..{max} for {kind:?}")]
    ValueOutOfRange {
        kind: CurveKind,
        value: f32,
        min: f32,
        max: f32,
    },
}

/// Errors from state (de)serialization and preset files
#[derive(Error, Debug)]
pub enum StateError {
    /// Document is not valid JSON, or not a JSON object
    #[error("Failed to parse state: {0}")]
    Parse(#[from] serde_json::Error),

    /// Preset file could not be read or written
    #[error("Preset I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
