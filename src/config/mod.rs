use std::path::{Path, PathBuf};
use log::warn;
use serde::{Deserialize, Serialize};
use crate::catalog;
use crate::error::ConfigError;
use crate::models::PlaybackRate;

/// Environment variable that overrides the configured API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Narrator configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NarratorConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub text_model: String,
    pub speech_model: String,
    pub voice_name: String,
    pub default_rate: PlaybackRate,
    pub preferred_device: Option<String>,
    pub request_timeout_secs: u64,
    pub progress_file: PathBuf,
    pub start_book: String,
    pub start_chapter: u32,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            voice_name: "Kore".to_string(),
            default_rate: PlaybackRate::default(),
            preferred_device: None,
            request_timeout_secs: 60,
            progress_file: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("scripture-narrator")
                .join("progress.json"),
            start_book: "창세기".to_string(),
            start_chapter: 1,
        }
    }
}

impl NarratorConfig {
    /// Replace values that cannot be used with their defaults
    fn sanitize(&mut self) {
        let defaults = NarratorConfig::default();

        if catalog::validate(&self.start_book, self.start_chapter).is_err() {
            warn!(
                "Configured start position {} {} does not exist, using {} {}",
                self.start_book, self.start_chapter, defaults.start_book, defaults.start_chapter
            );
            self.start_book = defaults.start_book;
            self.start_chapter = defaults.start_chapter;
        }

        if self.request_timeout_secs == 0 {
            warn!("request_timeout_secs must be positive, using {}", defaults.request_timeout_secs);
            self.request_timeout_secs = defaults.request_timeout_secs;
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: NarratorConfig,
    config_path: PathBuf,
    env_api_key: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Ok(Self::with_path(config_path))
    }

    /// Load from an explicit file. Missing or unreadable files fall back to defaults.
    pub fn with_path(config_path: PathBuf) -> Self {
        let mut config = Self::load_config(&config_path).unwrap_or_else(|e| {
            warn!("Ignoring configuration at {}: {}", config_path.display(), e);
            NarratorConfig::default()
        });
        config.sanitize();

        let env_api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());

        Self {
            config,
            config_path,
            env_api_key,
        }
    }

    /// Settings as stored on disk
    pub fn get_config(&self) -> &NarratorConfig {
        &self.config
    }

    /// Settings with environment overrides applied
    pub fn effective_config(&self) -> NarratorConfig {
        let mut config = self.config.clone();
        if let Some(key) = &self.env_api_key {
            config.api_key = Some(key.clone());
        }
        config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn set_default_rate(&mut self, rate: f32) -> Result<(), ConfigError> {
        let rate = PlaybackRate::new(rate).map_err(|_| ConfigError::InvalidValue {
            field: "default_rate".to_string(),
            value: rate.to_string(),
        })?;
        self.config.default_rate = rate;
        self.save_config()
    }

    pub fn set_preferred_device(&mut self, device: Option<String>) -> Result<(), ConfigError> {
        self.config.preferred_device = device;
        self.save_config()
    }

    /// Remember where to open next time
    pub fn set_start_position(&mut self, book: &str, chapter: u32) -> Result<(), ConfigError> {
        catalog::validate(book, chapter).map_err(|_| ConfigError::InvalidValue {
            field: "start_book".to_string(),
            value: format!("{} {}", book, chapter),
        })?;
        self.config.start_book = book.to_string();
        self.config.start_chapter = chapter;
        self.save_config()
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("scripture-narrator");

        std::fs::create_dir_all(&config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<NarratorConfig, ConfigError> {
        if !path.exists() {
            return Ok(NarratorConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: NarratorConfig = toml::from_str(&config_content)?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;

        Ok(())
    }
}
