pub mod gemini;

use async_trait::async_trait;

use crate::audio::EncodedAudio;
use crate::error::ServiceError;
use crate::models::{Chapter, WordAnalysis};

pub use gemini::GeminiClient;

/// Produces speech for a piece of text
#[async_trait]
pub trait SpeechSource: Send + Sync {
    /// Synthesize `text`. `Ok(None)` means the service had no audio for it.
    async fn synthesize(&self, text: &str) -> Result<Option<EncodedAudio>, ServiceError>;
}

/// Delivers chapter text
#[async_trait]
pub trait ChapterSource: Send + Sync {
    async fn get_chapter(&self, book: &str, chapter: u32) -> Result<Chapter, ServiceError>;
}

/// Looks up the original-language word behind a translated word
#[async_trait]
pub trait WordAnalysisSource: Send + Sync {
    /// Any failure is reported as `None`; analysis is never critical.
    async fn analyze_word(&self, word: &str, book: &str) -> Option<WordAnalysis>;
}
