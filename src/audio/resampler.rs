/*!
A streaming, variable-rate linear reader for mono speech buffers.

- Reads a decoded buffer at the device sample rate, scaled by the playback rate.
- The read position is kept in source frames, so changing the rate mid-buffer
  continues from the same point without restarting or skipping audio.
- Linear interpolation between neighbouring source frames.

Typical usage:

```ignore
use crate::audio::resampler::VariableRateReader;

let mut reader = VariableRateReader::new(audio, 48_000, 1.0);
while let Some(sample) = reader.next_sample() {
    // write `sample` to every device channel
}
```

Rate changes shift pitch together with tempo, like a tape played faster.
*/

use crate::models::DecodedAudio;

#[derive(Debug, Clone)]
pub struct VariableRateReader {
    samples: Vec<f32>,
    src_rate: u32,
    dst_rate: u32,
    rate: f32,

    // Derived: source frames advanced per output frame
    step: f64,

    // Current source position in frames
    pos: f64,
}

impl VariableRateReader {
    /// Create a reader.
    /// - audio: decoded buffer; multi-channel input is averaged down to mono
    /// - dst_rate: device stream rate (Hz)
    /// - rate: playback rate multiplier
    pub fn new(audio: DecodedAudio, dst_rate: u32, rate: f32) -> Self {
        let src_rate = audio.sample_rate;
        let samples = downmix(audio);
        let mut reader = Self {
            samples,
            src_rate,
            dst_rate,
            rate,
            step: 0.0,
            pos: 0.0,
        };
        reader.update_step();
        reader
    }

    fn update_step(&mut self) {
        self.step = if self.dst_rate == 0 {
            0.0
        } else {
            self.src_rate as f64 * self.rate as f64 / self.dst_rate as f64
        };
    }

    /// Change the playback rate, keeping the read position.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        self.update_step();
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Source frames consumed so far
    pub fn position(&self) -> usize {
        (self.pos.floor() as usize).min(self.samples.len())
    }

    pub fn is_finished(&self) -> bool {
        self.step <= 0.0 || self.pos >= self.samples.len() as f64
    }

    /// Produce the next output frame, or None once the buffer is exhausted.
    pub fn next_sample(&mut self) -> Option<f32> {
        if self.is_finished() {
            return None;
        }

        let i = self.pos.floor() as usize;
        let frac = (self.pos - i as f64) as f32;
        let s0 = self.samples[i];
        // Hold the final frame instead of interpolating toward silence
        let s1 = self.samples.get(i + 1).copied().unwrap_or(s0);

        self.pos += self.step;
        Some(s0 + (s1 - s0) * frac)
    }
}

fn downmix(audio: DecodedAudio) -> Vec<f32> {
    let channels = audio.channels as usize;
    if channels <= 1 {
        return audio.samples;
    }

    audio
        .samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
