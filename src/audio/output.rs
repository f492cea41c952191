use cpal::{SampleFormat, Stream, StreamConfig};
use cpal::traits::{DeviceTrait, StreamTrait};
use log::{debug, error, info};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use tokio::sync::oneshot;

use crate::audio::{AudioOutput, DeviceManager, VariableRateReader};
use crate::error::AudioError;
use crate::models::DecodedAudio;

/// The buffer currently being played, shared with the stream callback
struct Voice {
    reader: Option<VariableRateReader>,
    completion: Option<oneshot::Sender<()>>,
    paused: bool,
}

impl Voice {
    fn new() -> Self {
        Self {
            reader: None,
            completion: None,
            paused: false,
        }
    }

    /// Swap in a new buffer. A paused voice stays silent until resumed.
    fn load(&mut self, reader: VariableRateReader, paused: bool) -> oneshot::Receiver<()> {
        let (completion_tx, completion_rx) = oneshot::channel();
        // Replacing the sender resolves any previous receiver with an error
        self.reader = Some(reader);
        self.completion = Some(completion_tx);
        self.paused = paused;
        completion_rx
    }

    fn clear(&mut self) {
        self.reader = None;
        self.completion = None;
        self.paused = false;
    }

    /// Fill one device buffer. Mono speech is written to every channel.
    fn render<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: cpal::Sample + cpal::FromSample<f32>,
    {
        let silence = T::from_sample(0.0f32);

        let finished = match self.reader.as_mut() {
            Some(reader) if !self.paused => {
                for frame in data.chunks_mut(channels.max(1)) {
                    let value = reader.next_sample().map(T::from_sample).unwrap_or(silence);
                    frame.fill(value);
                }
                reader.is_finished()
            }
            _ => {
                data.fill(silence);
                false
            }
        };

        if finished {
            self.reader = None;
            if let Some(completion) = self.completion.take() {
                let _ = completion.send(());
            }
        }
    }
}

/// cpal-backed output. The stream is not `Send`, so it lives on its own thread
/// for the lifetime of this value.
pub struct CpalOutput {
    voice: Arc<Mutex<Voice>>,
    device_name: Option<String>,
    stream_rate: u32,
    shutdown: Option<mpsc::Sender<()>>,
    audio_thread: Option<thread::JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the preferred device (falling back to the default one) and start a silent stream
    pub fn new(preferred_device: Option<&str>) -> Result<Self, AudioError> {
        let mut devices = DeviceManager::new()?;
        devices.select_device_with_fallback(preferred_device)?;

        let device = devices.current_device()
            .cloned()
            .ok_or_else(|| AudioError::InitializationFailed("No device selected".to_string()))?;
        let device_name = devices.current_device_name()?;
        let supported = devices.current_config()?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let stream_rate = config.sample_rate.0;

        let voice = Arc::new(Mutex::new(Voice::new()));
        let thread_voice = Arc::clone(&voice);
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let audio_thread = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                // Set high priority for audio thread (platform-specific)
                #[cfg(target_os = "macos")]
                {
                    unsafe {
                        let thread = libc::pthread_self();
                        let mut policy: libc::c_int = 0;
                        let mut param: libc::sched_param = std::mem::zeroed();

                        if libc::pthread_getschedparam(thread, &mut policy, &mut param) == 0 {
                            param.sched_priority = 63;
                            let _ = libc::pthread_setschedparam(thread, libc::SCHED_FIFO, &param);
                        }
                    }
                }

                let stream_result = match sample_format {
                    SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, &thread_voice),
                    SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, &thread_voice),
                    SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, &thread_voice),
                    other => Err(AudioError::InitializationFailed(format!(
                        "Unsupported sample format: {:?}",
                        other
                    ))),
                };

                let stream = match stream_result {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::StreamError(format!(
                        "Failed to start audio stream: {}",
                        e
                    ))));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Park until the output is dropped
                let _ = shutdown_rx.recv();
                let _ = stream.pause();
                debug!("Audio output thread exiting");
            })
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to create audio thread: {}", e)))?;

        ready_rx.recv().map_err(|_| {
            AudioError::InitializationFailed("Audio thread exited during startup".to_string())
        })??;

        info!(
            "Audio output ready on {} at {} Hz",
            device_name.as_deref().unwrap_or("default device"),
            stream_rate
        );

        Ok(Self {
            voice,
            device_name,
            stream_rate,
            shutdown: Some(shutdown_tx),
            audio_thread: Some(audio_thread),
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        voice: &Arc<Mutex<Voice>>,
    ) -> Result<Stream, AudioError>
    where
        T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
    {
        let voice = Arc::clone(voice);
        let channels = config.channels as usize;

        device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                match voice.lock() {
                    Ok(mut voice) => voice.render(data, channels),
                    Err(_) => data.fill(T::from_sample(0.0f32)),
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(format!("Failed to build output stream: {}", e)))
    }

    pub fn stream_rate(&self) -> u32 {
        self.stream_rate
    }

    fn voice(&self) -> Result<MutexGuard<'_, Voice>, AudioError> {
        self.voice
            .lock()
            .map_err(|_| AudioError::StreamError("Audio state is unavailable".to_string()))
    }
}

impl AudioOutput for CpalOutput {
    fn start(&self, audio: DecodedAudio, rate: f32, paused: bool) -> Result<oneshot::Receiver<()>, AudioError> {
        let reader = VariableRateReader::new(audio, self.stream_rate, rate);
        Ok(self.voice()?.load(reader, paused))
    }

    fn pause(&self) -> Result<(), AudioError> {
        self.voice()?.paused = true;
        Ok(())
    }

    fn resume(&self) -> Result<(), AudioError> {
        self.voice()?.paused = false;
        Ok(())
    }

    fn halt(&self) {
        if let Ok(mut voice) = self.voice.lock() {
            voice.clear();
        }
    }

    fn set_rate(&self, rate: f32) {
        if let Ok(mut voice) = self.voice.lock() {
            if let Some(reader) = voice.reader.as_mut() {
                reader.set_rate(rate);
            }
        }
    }

    fn device_name(&self) -> Option<String> {
        self.device_name.clone()
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.halt();
        // Closing the channel wakes the output thread
        self.shutdown.take();
        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
    }
}
