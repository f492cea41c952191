use log::{debug, error, info};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioOutput;
use crate::error::AudioError;
use crate::logging::NarrationLogger;
use crate::models::{PlaybackRate, QueueEntry, SessionState};
use crate::pipeline::{PlaybackEvent, PlaybackObserver, PlaybackQueue};

struct EngineState {
    state: SessionState,
    sounding_unit: Option<u32>,
    resume_offset: u32,
    first_unit: u32,
    rate: PlaybackRate,
    token: Option<CancellationToken>,
    queue: Option<Arc<PlaybackQueue>>,
    generating: bool,
    /// Idle because of stop(), holding a resume position
    held: bool,
    /// Bumped by every begin and stop; tasks from an older session compare against it
    epoch: u64,
    started_at: Option<Instant>,
}

impl EngineState {
    fn visible_state(&self) -> SessionState {
        match self.state {
            SessionState::Idle if self.held => SessionState::Stopped,
            state => state,
        }
    }
}

enum Started {
    Playing(oneshot::Receiver<()>),
    Superseded,
    DeviceFailed,
}

/// Plays queued units one after another and owns the session state machine.
///
/// Every public method is synchronous and takes the state lock only briefly; events
/// are delivered to the observer after the lock is released.
pub struct PlaybackEngine {
    output: Arc<dyn AudioOutput>,
    observer: Arc<dyn PlaybackObserver>,
    logger: NarrationLogger,
    inner: Mutex<EngineState>,
}

impl PlaybackEngine {
    pub fn new(
        output: Arc<dyn AudioOutput>,
        observer: Arc<dyn PlaybackObserver>,
        logger: NarrationLogger,
        rate: PlaybackRate,
    ) -> Self {
        Self {
            output,
            observer,
            logger,
            inner: Mutex::new(EngineState {
                state: SessionState::Idle,
                sounding_unit: None,
                resume_offset: 1,
                first_unit: 1,
                rate,
                token: None,
                queue: None,
                generating: false,
                held: false,
                epoch: 0,
                started_at: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, events: Vec<PlaybackEvent>) {
        for event in events {
            self.observer.notify(event);
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().visible_state()
    }

    pub fn sounding_unit(&self) -> Option<u32> {
        self.lock().sounding_unit
    }

    pub fn resume_offset(&self) -> u32 {
        self.lock().resume_offset
    }

    pub fn rate(&self) -> PlaybackRate {
        self.lock().rate
    }

    pub fn is_loading(&self) -> bool {
        self.lock().generating
    }

    pub fn queued_units(&self) -> usize {
        self.lock().queue.as_ref().map(|q| q.len()).unwrap_or(0)
    }

    pub fn device_name(&self) -> Option<String> {
        self.output.device_name()
    }

    /// Point the resume position at the start of a newly loaded chapter
    pub fn reset_offset(&self, first_unit: u32) {
        let mut s = self.lock();
        s.first_unit = first_unit;
        s.resume_offset = first_unit;
        s.held = false;
    }

    /// Enter `Generating` for a new session. Returns the session epoch.
    pub fn begin(&self, token: CancellationToken, queue: Arc<PlaybackQueue>) -> Result<u64, AudioError> {
        let (epoch, events) = {
            let mut s = self.lock();
            if !matches!(s.state, SessionState::Idle) {
                return Err(AudioError::InvalidTransition {
                    action: "start narration",
                    state: s.visible_state().to_string(),
                });
            }

            s.epoch += 1;
            s.state = SessionState::Generating;
            s.generating = true;
            s.held = false;
            s.token = Some(token);
            s.queue = Some(queue);
            s.started_at = Some(Instant::now());
            debug!("Session {} starting at verse {}", s.epoch, s.resume_offset);

            let events = vec![
                PlaybackEvent::StateChanged(SessionState::Generating),
                PlaybackEvent::LoadingChanged(true),
            ];
            (s.epoch, events)
        };
        self.emit(events);
        Ok(epoch)
    }

    /// Spawn the consumer that plays `queue` until the session ends
    pub fn spawn_playback(
        self: &Arc<Self>,
        epoch: u64,
        token: CancellationToken,
        queue: Arc<PlaybackQueue>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_playback(epoch, token, queue).await })
    }

    async fn run_playback(&self, epoch: u64, token: CancellationToken, queue: Arc<PlaybackQueue>) {
        loop {
            let entry = match queue.pop_blocking(&token).await {
                Some(entry) => entry,
                None => {
                    self.finish(epoch);
                    return;
                }
            };

            let finished = match self.start_entry(epoch, entry) {
                Started::Playing(finished) => finished,
                Started::Superseded => return,
                Started::DeviceFailed => continue,
            };

            // Err means the buffer was halted or replaced rather than played out
            if finished.await.is_err() {
                debug!("Session {} playback interrupted", epoch);
                return;
            }
        }
    }

    fn start_entry(&self, epoch: u64, entry: QueueEntry) -> Started {
        let (events, finished) = {
            let mut s = self.lock();
            if s.epoch != epoch {
                return Started::Superseded;
            }

            let unit_id = entry.unit_id;
            let duration = entry.audio.duration();
            // Paused between two units: the next one is loaded held
            let hold = s.state == SessionState::Paused;
            let finished = match self.output.start(entry.audio, s.rate.value(), hold) {
                Ok(finished) => finished,
                Err(e) => {
                    error!("Could not play verse {}: {}", unit_id, e);
                    return Started::DeviceFailed;
                }
            };
            self.logger.log_unit_started(unit_id, duration);
            if let Some(started_at) = s.started_at.take() {
                self.logger.update_first_audio_latency(started_at.elapsed());
            }

            s.sounding_unit = Some(unit_id);
            let mut events = vec![PlaybackEvent::SoundingChanged(Some(unit_id))];
            match s.state {
                SessionState::Paused | SessionState::Playing => {}
                _ => {
                    s.state = SessionState::Playing;
                    events.push(PlaybackEvent::PlayingChanged(true));
                    events.push(PlaybackEvent::StateChanged(SessionState::Playing));
                }
            }
            (events, finished)
        };
        self.emit(events);
        Started::Playing(finished)
    }

    /// The queue ran dry after generation completed
    fn finish(&self, epoch: u64) {
        let events = {
            let mut s = self.lock();
            if s.epoch != epoch {
                return;
            }

            let mut events = Vec::new();
            if s.sounding_unit.take().is_some() {
                events.push(PlaybackEvent::SoundingChanged(None));
            }
            if matches!(s.state, SessionState::Playing | SessionState::Paused) {
                events.push(PlaybackEvent::PlayingChanged(false));
            }
            s.state = SessionState::Idle;
            s.resume_offset = s.first_unit;
            s.token = None;
            s.queue = None;
            s.generating = false;
            s.held = false;
            s.started_at = None;

            events.push(PlaybackEvent::StateChanged(SessionState::Idle));
            events.push(PlaybackEvent::ChapterFinished);
            events
        };
        info!("Chapter narration finished");
        self.logger.log_completed();
        self.emit(events);
    }

    /// Generation for `epoch` has ended; loading is over
    pub fn generation_finished(&self, epoch: u64) {
        {
            let mut s = self.lock();
            if s.epoch != epoch || !s.generating {
                return;
            }
            s.generating = false;
        }
        self.emit(vec![PlaybackEvent::LoadingChanged(false)]);
    }

    /// Stop the session `epoch` if it is still the current one
    pub fn abort(&self, epoch: u64) -> bool {
        let events = {
            let mut s = self.lock();
            if s.epoch != epoch {
                return false;
            }
            self.stop_locked(&mut s)
        };
        self.emit(events);
        true
    }

    /// Full stop. The sounding unit becomes the resume position. Always succeeds.
    pub fn stop(&self) {
        let events = {
            let mut s = self.lock();
            self.stop_locked(&mut s)
        };
        self.emit(events);
    }

    fn stop_locked(&self, s: &mut EngineState) -> Vec<PlaybackEvent> {
        let was = s.state;
        let mut events = Vec::new();

        if let Some(unit) = s.sounding_unit.take() {
            s.resume_offset = unit;
            events.push(PlaybackEvent::SoundingChanged(None));
        }
        if let Some(token) = s.token.take() {
            token.cancel();
        }
        if let Some(queue) = s.queue.take() {
            queue.clear();
        }
        s.epoch += 1;
        self.output.halt();

        if matches!(was, SessionState::Playing | SessionState::Paused) {
            events.push(PlaybackEvent::PlayingChanged(false));
        }
        if s.generating {
            s.generating = false;
            events.push(PlaybackEvent::LoadingChanged(false));
        }
        s.started_at = None;
        s.state = SessionState::Idle;

        if was != SessionState::Idle {
            s.held = true;
            self.logger.log_stopped(s.resume_offset);
            events.push(PlaybackEvent::StateChanged(SessionState::Stopped));
        }
        events
    }

    pub fn pause(&self) -> Result<(), AudioError> {
        let unit = {
            let mut s = self.lock();
            if s.state != SessionState::Playing {
                return Err(AudioError::InvalidTransition {
                    action: "pause",
                    state: s.visible_state().to_string(),
                });
            }
            self.output.pause()?;
            s.state = SessionState::Paused;
            s.sounding_unit
        };
        self.logger.log_paused(unit);
        self.emit(vec![
            PlaybackEvent::PlayingChanged(false),
            PlaybackEvent::StateChanged(SessionState::Paused),
        ]);
        Ok(())
    }

    pub fn resume(&self) -> Result<(), AudioError> {
        let unit = {
            let mut s = self.lock();
            if s.state != SessionState::Paused {
                return Err(AudioError::InvalidTransition {
                    action: "resume",
                    state: s.visible_state().to_string(),
                });
            }
            self.output.resume()?;
            s.state = SessionState::Playing;
            s.sounding_unit
        };
        self.logger.log_resumed(unit);
        self.emit(vec![
            PlaybackEvent::PlayingChanged(true),
            PlaybackEvent::StateChanged(SessionState::Playing),
        ]);
        Ok(())
    }

    /// Applies to the sounding unit and every later one
    pub fn set_rate(&self, rate: PlaybackRate) {
        self.lock().rate = rate;
        self.output.set_rate(rate.value());
        self.logger.log_rate_changed(rate.value());
    }
}
