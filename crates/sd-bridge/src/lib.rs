//! sd-bridge: Cross-thread parameter synchronization
//!
//! Two single-producer/single-consumer queues connect the audio thread and
//! the editor's UI thread:
//! - audio → UI: value snapshots, drained once per UI tick
//! - UI → audio: begin/adjust/end edit gestures, drained once per block
//!
//! CRITICAL: nothing reachable from [`AudioBus`] blocks, locks or allocates.

mod bus;
mod queue;
mod status;

pub use bus::*;
pub use queue::*;
pub use status::*;

/// Default capacity of each direction's queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;
