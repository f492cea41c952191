use base64::{engine::general_purpose, Engine as _};

use crate::error::DecodeError;
use crate::models::DecodedAudio;

/// Sample rate of synthesized speech
pub const SAMPLE_RATE: u32 = 24_000;
/// Speech is always mono
pub const CHANNELS: u16 = 1;
/// Bytes per frame: one 16-bit sample per channel
pub const FRAME_SIZE: usize = 2 * CHANNELS as usize;

/// A speech payload as it arrives from a speech source
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedAudio {
    /// Base64 text, as carried in the service's inline data
    Base64(String),
    /// Raw little-endian PCM bytes
    Pcm(Vec<u8>),
}

/// Decode raw 16-bit signed little-endian mono PCM into normalized samples.
pub fn decode(payload: &[u8]) -> Result<DecodedAudio, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    if payload.len() % FRAME_SIZE != 0 {
        return Err(DecodeError::MisalignedPayload {
            len: payload.len(),
            frame_size: FRAME_SIZE,
        });
    }

    let frames = payload.len() / FRAME_SIZE;
    let mut samples = Vec::new();
    samples
        .try_reserve_exact(frames)
        .map_err(|_| DecodeError::AllocationFailed { frames })?;

    samples.extend(
        payload
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0),
    );

    Ok(DecodedAudio::new(samples, SAMPLE_RATE, CHANNELS))
}

/// Decode a payload in either transport form.
pub fn decode_payload(payload: &EncodedAudio) -> Result<DecodedAudio, DecodeError> {
    match payload {
        EncodedAudio::Pcm(bytes) => decode(bytes),
        EncodedAudio::Base64(text) => {
            let bytes = general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| DecodeError::InvalidEncoding(e.to_string()))?;
            decode(&bytes)
        }
    }
}
