pub mod decoder;
pub mod device;
pub mod output;
pub mod resampler;

use tokio::sync::oneshot;
use crate::error::AudioError;
use crate::models::DecodedAudio;

// Re-export device management types
pub use device::{DeviceInfo, DeviceManager};

pub use decoder::{decode, decode_payload, EncodedAudio};
pub use output::CpalOutput;
pub use resampler::VariableRateReader;

/// Core trait for audio output.
///
/// Calls are non-blocking: `start` schedules a buffer and hands back a receiver that
/// resolves once the buffer has played to its end. If the buffer is replaced or
/// halted first, the sender is dropped and the receiver reports an error instead.
pub trait AudioOutput: Send + Sync {
    /// Start a buffer at the given rate, replacing anything already playing.
    /// With `paused` set the buffer is loaded but held silent until `resume`.
    fn start(&self, audio: DecodedAudio, rate: f32, paused: bool) -> Result<oneshot::Receiver<()>, AudioError>;

    /// Suspend output, keeping the buffer position
    fn pause(&self) -> Result<(), AudioError>;

    /// Continue a suspended buffer
    fn resume(&self) -> Result<(), AudioError>;

    /// Drop the current buffer immediately. Always succeeds.
    fn halt(&self);

    /// Change the rate of the current and all later buffers
    fn set_rate(&self, rate: f32);

    /// Name of the device being played to, if known
    fn device_name(&self) -> Option<String> {
        None
    }
}
