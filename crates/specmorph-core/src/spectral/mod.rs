//! Frequency-domain processing
//!
//! - [`evaluator`]: morph-blended per-bin parameters from bank lookup tables
//! - [`frame`]: the three-phase bin transform
//! - [`delay_line`], [`feedback`]: state carried between frames
//! - [`spectrograph`]: try-lock magnitude snapshot for the UI

pub mod delay_line;
pub mod evaluator;
pub mod feedback;
pub mod frame;
pub mod spectrograph;

pub use delay_line::BinDelayLines;
pub use evaluator::{BinParameterEvaluator, BinParameters, FrameDecisions, SkipFlags};
pub use feedback::FeedbackState;
pub use frame::{FrameStats, SpectralFrameProcessor};
pub use spectrograph::{Spectrograph, SpectrographFrame};
