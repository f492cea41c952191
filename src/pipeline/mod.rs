//! Generation and playback of a chapter, one verse at a time.
//!
//! A play session owns a cancellation token and a queue. The generation controller
//! fills the queue in verse order while the playback engine drains it, so the first
//! verse sounds while later ones are still being synthesized.

pub mod engine;
pub mod generation;
pub mod observer;
pub mod queue;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::PlaybackEngine;
pub use generation::{units_from, GenerationController, GenerationOutcome};
pub use observer::{ChannelObserver, PlaybackEvent, PlaybackObserver};
pub use queue::PlaybackQueue;
pub use session::{PlayAction, PlaybackSession};

#[cfg(test)]
pub use observer::RecordingObserver;
