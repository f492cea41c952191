//! Scripted stand-ins for the speech service and the audio device.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::audio::{AudioOutput, EncodedAudio};
use crate::error::{AudioError, ServiceError};
use crate::models::{Chapter, DecodedAudio, TextUnit};
use crate::services::{ChapterSource, SpeechSource};

/// What the fake service answers for a given text
#[derive(Debug, Clone)]
pub enum Reply {
    Audio,
    Nothing,
    Garbage,
    Fail(ServiceError),
}

pub struct ScriptedSpeech {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl ScriptedSpeech {
    pub fn new(delay: Duration) -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn reply(self, text: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert(text.to_string(), reply);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSource for ScriptedSpeech {
    async fn synthesize(&self, text: &str) -> Result<Option<EncodedAudio>, ServiceError> {
        self.requests.lock().unwrap().push(text.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or(Reply::Audio);
        match reply {
            // Two frames, base64 encoded the way the service sends them
            Reply::Audio => Ok(Some(EncodedAudio::Base64(STANDARD.encode([0u8, 16, 0, 240])))),
            Reply::Nothing => Ok(None),
            Reply::Garbage => Ok(Some(EncodedAudio::Pcm(vec![1, 2, 3]))),
            Reply::Fail(err) => Err(err),
        }
    }
}

pub struct FixedChapters {
    pub requests: Mutex<Vec<(String, u32)>>,
    pub fail_with: Mutex<Option<ServiceError>>,
}

impl FixedChapters {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ChapterSource for FixedChapters {
    async fn get_chapter(&self, book: &str, chapter: u32) -> Result<Chapter, ServiceError> {
        self.requests.lock().unwrap().push((book.to_string(), chapter));
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(chapter_of(book, chapter, 3))
    }
}

pub fn chapter_of(book: &str, chapter: u32, verses: u32) -> Chapter {
    let units = (1..=verses)
        .map(|id| TextUnit::new(id, format!("{} {}:{}", book, chapter, id)))
        .collect();
    Chapter::new(book, chapter, units)
}

#[derive(Default)]
struct OutputState {
    current: Option<oneshot::Sender<()>>,
    started: Vec<usize>,
    paused: bool,
    paused_starts: usize,
    halts: usize,
    rate: f32,
}

/// Device double whose buffers finish only when the test says so
#[derive(Default)]
pub struct FakeOutput {
    state: Mutex<OutputState>,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete the buffer that is sounding now
    pub fn finish(&self) -> bool {
        match self.state.lock().unwrap().current.take() {
            Some(done) => done.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.state.lock().unwrap().current.is_some()
    }

    /// Frame counts of every buffer handed to the device
    pub fn started(&self) -> Vec<usize> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    /// Buffers that were handed over already held
    pub fn paused_starts(&self) -> usize {
        self.state.lock().unwrap().paused_starts
    }

    pub fn halts(&self) -> usize {
        self.state.lock().unwrap().halts
    }

    pub fn rate(&self) -> f32 {
        self.state.lock().unwrap().rate
    }
}

impl AudioOutput for FakeOutput {
    fn start(&self, audio: DecodedAudio, rate: f32, paused: bool) -> Result<oneshot::Receiver<()>, AudioError> {
        let (done, finished) = oneshot::channel();
        let mut state = self.state.lock().unwrap();
        state.current = Some(done);
        state.started.push(audio.frames());
        state.paused = paused;
        state.paused_starts += usize::from(paused);
        state.rate = rate;
        Ok(finished)
    }

    fn pause(&self) -> Result<(), AudioError> {
        self.state.lock().unwrap().paused = true;
        Ok(())
    }

    fn resume(&self) -> Result<(), AudioError> {
        self.state.lock().unwrap().paused = false;
        Ok(())
    }

    fn halt(&self) {
        let mut state = self.state.lock().unwrap();
        state.current = None;
        state.halts += 1;
    }

    fn set_rate(&self, rate: f32) {
        self.state.lock().unwrap().rate = rate;
    }
}

/// Poll `condition` on the paused test clock until it holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition never became true");
}
