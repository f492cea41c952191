use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::audio::EncodedAudio;
use crate::catalog;
use crate::config::NarratorConfig;
use crate::error::ServiceError;
use crate::models::{Chapter, TextUnit, WordAnalysis};
use crate::services::{ChapterSource, SpeechSource, WordAnalysisSource};

const USER_AGENT: &str = concat!("scripture-narrator/", env!("CARGO_PKG_VERSION"));

/// REST client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    speech_model: String,
    voice_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Deserialize)]
struct VersePayload {
    verses: Option<Vec<RawVerse>>,
}

#[derive(Debug, Deserialize)]
struct RawVerse {
    verse: u32,
    #[serde(default)]
    text: Value,
}

impl GenerateResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Base64 audio of the first candidate's first part
    fn inline_audio(&self) -> Option<String> {
        self.first_parts()
            .first()
            .and_then(|p| p.inline_data.as_ref())
            .map(|d| d.data.clone())
            .filter(|d| !d.is_empty())
    }
}

impl GeminiClient {
    pub fn new(config: &NarratorConfig) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::TransientNetwork(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            speech_model: config.speech_model.clone(),
            voice_name: config.voice_name.clone(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, model: &str, body: Value) -> Result<GenerateResponse, ServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ServiceError::AuthOrQuota("No API key configured".to_string()))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::TransientNetwork(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &error_text));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))
    }
}

/// Map a failed HTTP status onto the service error taxonomy
fn classify_status(status: u16, body: &str) -> ServiceError {
    let detail = if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>())
    };

    match status {
        401 | 403 | 429 => ServiceError::AuthOrQuota(detail),
        _ => ServiceError::TransientNetwork(detail),
    }
}

/// Trim a verse and strip one pair of surrounding double quotes
fn clean_verse_text(text: &str) -> String {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

fn parse_chapter(book: &str, chapter: u32, json_text: &str) -> Result<Chapter, ServiceError> {
    let payload: VersePayload = serde_json::from_str(json_text.trim())
        .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

    let verses = payload
        .verses
        .ok_or_else(|| ServiceError::MalformedResponse("Response has no verses array".to_string()))?;

    let units = verses
        .into_iter()
        .map(|v| {
            let text = match v.text {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            TextUnit::new(v.verse, clean_verse_text(&text))
        })
        .collect();

    Ok(Chapter::new(book, chapter, units))
}

fn chapter_request(book: &str, chapter: u32) -> Value {
    let prompt = format!(
        "Provide all verses for the book \"{}\", chapter {} from the Korean Bible (개역개정 version if possible).\n\
         The response must be a JSON object that strictly follows the provided schema. \
         Do not include any markdown, backticks, or other text outside of the JSON object itself.",
        book, chapter
    );

    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "verses": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "verse": { "type": "INTEGER" },
                                "text": { "type": "STRING" }
                            },
                            "required": ["verse", "text"]
                        }
                    }
                },
                "required": ["verses"]
            }
        }
    })
}

fn speech_request(text: &str, voice_name: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": text }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice_name }
                }
            }
        }
    })
}

fn word_analysis_request(word: &str, book: &str) -> Value {
    let language = if catalog::is_old_testament(book) { "Hebrew" } else { "Greek" };
    let prompt = format!(
        "Analyze the Korean Bible word \"{word}\" from the book of \"{book}\".\n\
         1. Find the original {language} word.\n\
         2. Provide its phonetic pronunciation in Korean.\n\
         3. Provide its Strong's Concordance number and a concise analysis of its meaning in Korean.\n\
         4. List 5 most important bible verses that contain this original word.\n\
         Provide the response as a JSON object strictly following the schema. Do not include markdown or any other text."
    );

    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "originalWord": { "type": "STRING" },
                    "pronunciation": { "type": "STRING" },
                    "strongsAnalysis": { "type": "STRING" },
                    "exampleVerses": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "reference": { "type": "STRING" },
                                "text": { "type": "STRING" }
                            },
                            "required": ["reference", "text"]
                        }
                    }
                },
                "required": ["originalWord", "pronunciation", "strongsAnalysis", "exampleVerses"]
            }
        }
    })
}

#[async_trait]
impl ChapterSource for GeminiClient {
    async fn get_chapter(&self, book: &str, chapter: u32) -> Result<Chapter, ServiceError> {
        let response = self.generate(&self.text_model, chapter_request(book, chapter)).await?;
        let text = response.text().ok_or_else(|| {
            ServiceError::MalformedResponse("Response has no text content".to_string())
        })?;

        let parsed = parse_chapter(book, chapter, &text)?;
        debug!("Fetched {} with {} verses", parsed.reference(), parsed.units.len());
        Ok(parsed)
    }
}

#[async_trait]
impl SpeechSource for GeminiClient {
    async fn synthesize(&self, text: &str) -> Result<Option<EncodedAudio>, ServiceError> {
        let response = self
            .generate(&self.speech_model, speech_request(text, &self.voice_name))
            .await?;
        Ok(response.inline_audio().map(EncodedAudio::Base64))
    }
}

#[async_trait]
impl WordAnalysisSource for GeminiClient {
    async fn analyze_word(&self, word: &str, book: &str) -> Option<WordAnalysis> {
        let result: Result<WordAnalysis, ServiceError> = async {
            let response = self.generate(&self.text_model, word_analysis_request(word, book)).await?;
            let text = response.text().ok_or_else(|| {
                ServiceError::MalformedResponse("Response has no text content".to_string())
            })?;
            serde_json::from_str::<WordAnalysis>(text.trim())
                .map_err(|e| ServiceError::MalformedResponse(e.to_string()))
        }
        .await;

        match result {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!("Word analysis for '{}' unavailable: {}", word, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_without_key() -> GeminiClient {
        let config = NarratorConfig {
            api_key: None,
            ..NarratorConfig::default()
        };
        GeminiClient::new(&config).unwrap()
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(classify_status(401, ""), ServiceError::AuthOrQuota(_)));
        assert!(matches!(classify_status(403, "denied"), ServiceError::AuthOrQuota(_)));
        assert!(matches!(classify_status(429, "quota"), ServiceError::AuthOrQuota(_)));
        assert!(matches!(classify_status(500, ""), ServiceError::TransientNetwork(_)));
        assert!(matches!(classify_status(503, ""), ServiceError::TransientNetwork(_)));

        assert_eq!(
            classify_status(401, ""),
            ServiceError::AuthOrQuota("HTTP 401".to_string())
        );
    }

    #[test]
    fn test_clean_verse_text() {
        assert_eq!(clean_verse_text("  태초에  "), "태초에");
        assert_eq!(clean_verse_text("\"빛이 있으라\""), "빛이 있으라");
        assert_eq!(clean_verse_text("\"\"인용\"\""), "\"인용\"");
        assert_eq!(clean_verse_text("\""), "\"");
        assert_eq!(clean_verse_text("\"열린 따옴표"), "\"열린 따옴표");
    }

    #[test]
    fn test_parse_chapter() {
        let json = r#"{"verses": [
            {"verse": 1, "text": "태초에 하나님이 천지를 창조하시니라"},
            {"verse": 2, "text": " \"땅이 혼돈하고\" "},
            {"verse": 3}
        ]}"#;
        let chapter = parse_chapter("창세기", 1, json).unwrap();

        assert_eq!(chapter.book, "창세기");
        assert_eq!(chapter.chapter, 1);
        assert_eq!(chapter.units.len(), 3);
        assert_eq!(chapter.units[1].content, "땅이 혼돈하고");
        assert!(!chapter.units[2].is_speakable());
    }

    #[test]
    fn test_parse_chapter_rejects_missing_verses() {
        assert!(matches!(
            parse_chapter("창세기", 1, r#"{"chapter": 1}"#),
            Err(ServiceError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_chapter("창세기", 1, "not json"),
            Err(ServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_response_inline_audio() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [{ "inlineData": { "mimeType": "audio/L16;rate=24000", "data": "AAAA" } }]
                }
            }]
        }))
        .unwrap();
        assert_eq!(response.inline_audio(), Some("AAAA".to_string()));
        assert_eq!(response.text(), None);

        let empty: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert_eq!(empty.inline_audio(), None);
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"verses\":" }, { "text": "[]}" }] } }]
        }))
        .unwrap();
        assert_eq!(response.text(), Some("{\"verses\":[]}".to_string()));
    }

    #[test]
    fn test_word_analysis_language() {
        let ot = word_analysis_request("태초", "창세기").to_string();
        assert!(ot.contains("Hebrew"));
        let nt = word_analysis_request("말씀", "요한복음").to_string();
        assert!(nt.contains("Greek"));
    }

    #[test]
    fn test_speech_request_uses_voice() {
        let body = speech_request("태초에", "Kore");
        assert_eq!(
            body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
        assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_auth_error() {
        let client = client_without_key();
        assert!(!client.has_api_key());

        let result = client.synthesize("태초에").await;
        assert!(matches!(result, Err(ServiceError::AuthOrQuota(_))));

        let result = client.get_chapter("창세기", 1).await;
        assert!(matches!(result, Err(ServiceError::AuthOrQuota(_))));
    }

    #[tokio::test]
    async fn test_word_analysis_failure_is_none() {
        let client = client_without_key();
        assert_eq!(client.analyze_word("태초", "창세기").await, None);
    }
}
