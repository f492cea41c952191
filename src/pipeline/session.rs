use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioOutput;
use crate::catalog;
use crate::error::{AudioError, NarratorError, ServiceError};
use crate::logging::NarrationLogger;
use crate::models::{Chapter, PlaybackRate, PlayerStatus, SessionState};
use crate::pipeline::{
    units_from, GenerationController, GenerationOutcome, PlaybackEngine, PlaybackEvent,
    PlaybackObserver, PlaybackQueue,
};
use crate::services::{ChapterSource, SpeechSource};

/// What a play request ended up doing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayAction {
    Started { from_unit: u32 },
    Paused,
    Resumed,
    /// A session is already loading its first unit
    StillLoading,
}

/// The narrator as the UI sees it: the open chapter plus one engine
pub struct PlaybackSession {
    engine: Arc<PlaybackEngine>,
    speech: Arc<dyn SpeechSource>,
    chapters: Arc<dyn ChapterSource>,
    observer: Arc<dyn PlaybackObserver>,
    logger: NarrationLogger,
    chapter: Mutex<Option<Arc<Chapter>>>,
    last_error: Arc<Mutex<Option<String>>>,
    generation: Mutex<Option<JoinHandle<GenerationOutcome>>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PlaybackSession {
    pub fn new(
        speech: Arc<dyn SpeechSource>,
        chapters: Arc<dyn ChapterSource>,
        output: Arc<dyn AudioOutput>,
        observer: Arc<dyn PlaybackObserver>,
        logger: NarrationLogger,
        rate: PlaybackRate,
    ) -> Self {
        let engine = Arc::new(PlaybackEngine::new(
            output,
            Arc::clone(&observer),
            logger.clone(),
            rate,
        ));
        Self {
            engine,
            speech,
            chapters,
            observer,
            logger,
            chapter: Mutex::new(None),
            last_error: Arc::new(Mutex::new(None)),
            generation: Mutex::new(None),
        }
    }

    pub fn chapter(&self) -> Option<Arc<Chapter>> {
        locked(&self.chapter).clone()
    }

    pub fn state(&self) -> SessionState {
        self.engine.state()
    }

    pub fn last_error(&self) -> Option<String> {
        locked(&self.last_error).clone()
    }

    /// The single play control: start, pause or resume depending on state
    pub fn play(&self) -> Result<PlayAction, NarratorError> {
        match self.engine.state() {
            SessionState::Playing => {
                self.engine.pause()?;
                Ok(PlayAction::Paused)
            }
            SessionState::Paused => {
                self.engine.resume()?;
                Ok(PlayAction::Resumed)
            }
            SessionState::Generating => {
                self.observer.notify(PlaybackEvent::LoadingChanged(true));
                Ok(PlayAction::StillLoading)
            }
            SessionState::Idle | SessionState::Stopped => self.start_session(),
        }
    }

    fn start_session(&self) -> Result<PlayAction, NarratorError> {
        let chapter = self.chapter().ok_or(AudioError::InvalidTransition {
            action: "play",
            state: "no chapter is open".to_string(),
        })?;

        let token = CancellationToken::new();
        let queue = Arc::new(PlaybackQueue::new());
        let from_unit = self.engine.resume_offset();
        let epoch = self.engine.begin(token.clone(), Arc::clone(&queue))?;

        *locked(&self.last_error) = None;
        self.logger.log_session_started(&chapter.reference(), from_unit);
        info!("Narrating {} from verse {}", chapter.reference(), from_unit);

        self.engine.spawn_playback(epoch, token.clone(), Arc::clone(&queue));

        let controller = GenerationController::new(
            Arc::clone(&self.speech),
            queue,
            token,
            self.logger.clone(),
        );
        let engine = Arc::clone(&self.engine);
        let observer = Arc::clone(&self.observer);
        let last_error = Arc::clone(&self.last_error);

        let generation = tokio::spawn(async move {
            let outcome = controller.run(units_from(&chapter.units, from_unit)).await;
            if let GenerationOutcome::Failed(err) = &outcome {
                // A stop that already ended this session wins over the failure
                if engine.abort(epoch) {
                    warn!("Narration stopped: {}", err);
                    *locked(&last_error) = Some(err.user_message());
                    observer.notify(PlaybackEvent::Failed(err.clone()));
                }
            }
            engine.generation_finished(epoch);
            outcome
        });
        *locked(&self.generation) = Some(generation);

        Ok(PlayAction::Started { from_unit })
    }

    pub fn pause(&self) -> Result<(), NarratorError> {
        Ok(self.engine.pause()?)
    }

    pub fn resume(&self) -> Result<(), NarratorError> {
        Ok(self.engine.resume()?)
    }

    /// Halt everything. The sounding verse becomes the resume position.
    pub fn stop(&self) {
        self.engine.stop();
    }

    pub fn set_rate(&self, rate: f32) -> Result<PlaybackRate, NarratorError> {
        let rate = PlaybackRate::new(rate)?;
        self.engine.set_rate(rate);
        Ok(rate)
    }

    /// Replace the open chapter; narration will start from its first verse
    pub fn load_chapter(&self, chapter: Chapter) -> Arc<Chapter> {
        self.engine.stop();
        self.engine.reset_offset(chapter.first_unit_id());
        let chapter = Arc::new(chapter);
        *locked(&self.chapter) = Some(Arc::clone(&chapter));
        chapter
    }

    /// Fetch a chapter's text and load it
    pub async fn open_chapter(&self, book: &str, chapter: u32) -> Result<Arc<Chapter>, NarratorError> {
        let entry = catalog::validate(book, chapter)?;
        // The old chapter is gone even if the fetch fails
        self.engine.stop();
        self.engine.reset_offset(1);
        *locked(&self.chapter) = None;

        match self.chapters.get_chapter(entry.name, chapter).await {
            Ok(fetched) => {
                info!("Loaded {} with {} verses", fetched.reference(), fetched.units.len());
                Ok(self.load_chapter(fetched))
            }
            Err(e) => {
                self.record_error(&e);
                Err(e.into())
            }
        }
    }

    /// Stop and open the chapter after the current one. None at the end of the canon.
    pub async fn next_chapter(&self) -> Result<Option<Arc<Chapter>>, NarratorError> {
        self.engine.stop();
        let current = self.chapter().ok_or(AudioError::InvalidTransition {
            action: "advance",
            state: "no chapter is open".to_string(),
        })?;

        match catalog::next_chapter(&current.book, current.chapter)? {
            Some((book, chapter)) => self.open_chapter(book.name, chapter).await.map(Some),
            None => Ok(None),
        }
    }

    fn record_error(&self, error: &ServiceError) {
        self.logger.log_service_error(&error.to_string());
        *locked(&self.last_error) = Some(error.user_message());
    }

    /// Wait for the most recent generation run to end
    pub async fn generation_outcome(&self) -> Option<GenerationOutcome> {
        let handle = locked(&self.generation).take()?;
        handle.await.ok()
    }

    pub fn status(&self) -> PlayerStatus {
        let chapter = self.chapter();
        PlayerStatus {
            state: self.engine.state(),
            book: chapter.as_ref().map(|c| c.book.clone()),
            chapter: chapter.as_ref().map(|c| c.chapter),
            sounding_unit: self.engine.sounding_unit(),
            resume_offset: self.engine.resume_offset(),
            rate: self.engine.rate(),
            is_loading: self.engine.is_loading(),
            queued_units: self.engine.queued_units(),
            total_units: chapter.as_ref().map(|c| c.units.len()).unwrap_or(0),
            output_device: self.engine.device_name(),
            last_error: self.last_error(),
        }
    }
}
