//! Lock-free command queue from the control thread to the audio thread
//!
//! Only structural changes travel through the queue. Curve and bank edits
//! go through the bank mutex, and scalar settings through atomics in
//! [`SharedState`](super::shared::SharedState).
//!
//! The audio thread drains the queue at the start of every block, which is
//! the only point where delay lines may be replaced.

use basedrop::Owned;

use crate::spectral::BinDelayLines;

/// Commands applied by the audio thread at block boundaries
pub enum EngineCommand {
    /// Install larger delay lines; the old set is dropped via the collector
    SwapDelayLines(Owned<BinDelayLines>),
    /// Clear overlap-add buffers, delay lines and feedback
    Reset,
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SwapDelayLines(lines) => f
                .debug_tuple("SwapDelayLines")
                .field(&lines.capacity())
                .finish(),
            Self::Reset => f.write_str("Reset"),
        }
    }
}

/// Capacity of the command queue
///
/// Swaps are rare (one per delay-range increase), so a small queue suffices.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Create the (Producer, Consumer) pair: producer for the control thread,
/// consumer for the audio thread
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
