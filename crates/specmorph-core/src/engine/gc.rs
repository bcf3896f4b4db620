//! Deferred deallocation for buffers released on the audio thread
//!
//! Per-bin delay lines can reach tens of megabytes at long delay ranges.
//! When the engine swaps in a larger set, the old set must not be freed on
//! the audio thread. Wrapping it in `basedrop::Owned` turns the drop into a
//! pointer enqueue; the memory is released on a background collector thread.
//!
//! ```ignore
//! use basedrop::Owned;
//! use crate::engine::gc::gc_handle;
//!
//! let lines = Owned::new(&gc_handle(), BinDelayLines::new(1024, 96));
//! drop(lines); // queued, freed on the collector thread
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Interval between collection passes
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("specmorph-gc".to_string())
        .spawn(move || {
            // Collector is !Sync and must live on this thread
            let mut collector = Collector::new();
            tx.send(collector.handle()).expect("Failed to send GC handle");

            log::info!("Delay-line collector thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn collector thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Handle for wrapping allocations in `Owned<T>` / `Shared<T>`
///
/// The collector thread is started on first use.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
