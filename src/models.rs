use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::AudioError;

/// One speakable segment of a chapter (a verse)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextUnit {
    pub id: u32,
    pub content: String,
}

impl TextUnit {
    pub fn new(id: u32, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
        }
    }

    /// Whether there is anything to narrate
    pub fn is_speakable(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// A chapter as delivered by the chapter source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub book: String,
    pub chapter: u32,
    pub units: Vec<TextUnit>,
}

impl Chapter {
    pub fn new(book: impl Into<String>, chapter: u32, units: Vec<TextUnit>) -> Self {
        Self {
            book: book.into(),
            chapter,
            units,
        }
    }

    /// Id of the first unit, or 1 for an empty chapter
    pub fn first_unit_id(&self) -> u32 {
        self.units.first().map(|u| u.id).unwrap_or(1)
    }

    /// Index of the unit with the given id
    pub fn position_of(&self, unit_id: u32) -> Option<usize> {
        self.units.iter().position(|u| u.id == unit_id)
    }

    pub fn unit(&self, unit_id: u32) -> Option<&TextUnit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    /// Human-readable reference such as "창세기 1장"
    pub fn reference(&self) -> String {
        format!("{} {}장", self.book, self.chapter)
    }
}

/// Playable mono PCM produced from one speech payload
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration at normal speed
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
        }
    }
}

/// Decoded audio paired with the unit it narrates
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub audio: DecodedAudio,
    pub unit_id: u32,
}

impl QueueEntry {
    pub fn new(audio: DecodedAudio, unit_id: u32) -> Self {
        Self { audio, unit_id }
    }
}

/// Narration speed, restricted to the offered set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct PlaybackRate(f32);

impl PlaybackRate {
    pub const OPTIONS: [f32; 6] = [0.8, 1.0, 1.1, 1.3, 1.5, 1.7];

    pub fn new(rate: f32) -> Result<Self, AudioError> {
        Self::OPTIONS
            .iter()
            .copied()
            .find(|option| (option - rate).abs() < 1e-3)
            .map(PlaybackRate)
            .ok_or(AudioError::UnsupportedRate { rate })
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        PlaybackRate(1.0)
    }
}

impl TryFrom<f32> for PlaybackRate {
    type Error = AudioError;

    fn try_from(rate: f32) -> Result<Self, Self::Error> {
        PlaybackRate::new(rate)
    }
}

impl From<PlaybackRate> for f32 {
    fn from(rate: PlaybackRate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}x", self.0)
    }
}

/// Mode of the current play session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Generating,
    Playing,
    Paused,
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Generating => "loading",
            SessionState::Playing => "playing",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the narrator shown by the status command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerStatus {
    pub state: SessionState,
    pub book: Option<String>,
    pub chapter: Option<u32>,
    pub sounding_unit: Option<u32>,
    pub resume_offset: u32,
    pub rate: PlaybackRate,
    pub is_loading: bool,
    pub queued_units: usize,
    pub total_units: usize,
    pub output_device: Option<String>,
    pub last_error: Option<String>,
}

impl PlayerStatus {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            book: None,
            chapter: None,
            sounding_unit: None,
            resume_offset: 1,
            rate: PlaybackRate::default(),
            is_loading: false,
            queued_units: 0,
            total_units: 0,
            output_device: None,
            last_error: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    /// Reference of the open chapter, if any
    pub fn reference(&self) -> Option<String> {
        match (&self.book, self.chapter) {
            (Some(book), Some(chapter)) => Some(format!("{} {}장", book, chapter)),
            _ => None,
        }
    }
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// A verse quoted in a word analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExampleVerse {
    pub reference: String,
    pub text: String,
}

/// Original-language analysis of a single word
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordAnalysis {
    pub original_word: String,
    pub pronunciation: String,
    pub strongs_analysis: String,
    pub example_verses: Vec<ExampleVerse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chapter() -> Chapter {
        Chapter::new(
            "창세기",
            1,
            vec![
                TextUnit::new(1, "태초에 하나님이 천지를 창조하시니라"),
                TextUnit::new(2, "   "),
                TextUnit::new(3, "하나님이 이르시되 빛이 있으라 하시니 빛이 있었고"),
            ],
        )
    }

    #[test]
    fn test_text_unit_speakable() {
        assert!(TextUnit::new(1, "text").is_speakable());
        assert!(!TextUnit::new(2, " \t\n").is_speakable());
        assert!(!TextUnit::new(3, "").is_speakable());
    }

    #[test]
    fn test_chapter_lookup() {
        let chapter = sample_chapter();
        assert_eq!(chapter.first_unit_id(), 1);
        assert_eq!(chapter.position_of(3), Some(2));
        assert_eq!(chapter.position_of(9), None);
        assert_eq!(chapter.unit(1).map(|u| u.id), Some(1));
        assert_eq!(chapter.reference(), "창세기 1장");

        let empty = Chapter::new("룻기", 1, Vec::new());
        assert_eq!(empty.first_unit_id(), 1);
    }

    #[test]
    fn test_decoded_audio_duration() {
        let audio = DecodedAudio::new(vec![0.0; 24000], 24000, 1);
        assert_eq!(audio.frames(), 24000);
        assert_eq!(audio.duration(), Duration::from_secs(1));

        let stereo = DecodedAudio::new(vec![0.0; 48000], 48000, 2);
        assert_eq!(stereo.frames(), 24000);
        assert_eq!(stereo.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_playback_rate_options() {
        for option in PlaybackRate::OPTIONS {
            assert_eq!(PlaybackRate::new(option).unwrap().value(), option);
        }
        assert!(PlaybackRate::new(2.0).is_err());
        assert!(PlaybackRate::new(0.0).is_err());
        assert_eq!(PlaybackRate::default().value(), 1.0);
        assert_eq!(PlaybackRate::new(1.5).unwrap().to_string(), "1.5x");
    }

    #[test]
    fn test_playback_rate_serde_rejects_unknown_speed() {
        let rate: PlaybackRate = serde_json::from_str("1.3").unwrap();
        assert_eq!(rate.value(), 1.3);
        assert!(serde_json::from_str::<PlaybackRate>("3.0").is_err());
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Generating.to_string(), "loading");
        assert_eq!(SessionState::Paused.as_str(), "paused");
    }

    #[test]
    fn test_player_status_reference() {
        let mut status = PlayerStatus::new();
        assert_eq!(status.reference(), None);
        status.book = Some("요한복음".to_string());
        status.chapter = Some(3);
        assert_eq!(status.reference(), Some("요한복음 3장".to_string()));
        assert!(!status.is_playing());
    }

    #[test]
    fn test_word_analysis_deserialization() {
        let json = r#"{
            "originalWord": "בְּרֵאשִׁית",
            "pronunciation": "베레쉬트",
            "strongsAnalysis": "H7225: 처음, 시작",
            "exampleVerses": [{"reference": "창세기 1:1", "text": "태초에..."}]
        }"#;
        let analysis: WordAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.pronunciation, "베레쉬트");
        assert_eq!(analysis.example_verses.len(), 1);
    }
}
