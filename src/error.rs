use thiserror::Error;

/// Main narrator error type
#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl NarratorError {
    /// Get user-friendly error message with suggested solutions
    pub fn user_message(&self) -> String {
        match self {
            NarratorError::Audio(err) => err.user_message(),
            NarratorError::File(err) => Self::format_file_error(err),
            NarratorError::Decode(err) => err.user_message(),
            NarratorError::Service(err) => err.user_message(),
            NarratorError::Config(err) => err.user_message(),
            NarratorError::Catalog(err) => err.user_message(),
            NarratorError::Progress(err) => err.user_message(),
            NarratorError::Parse(err) => format!("Command error: {}", err),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            NarratorError::Audio(err) => err.recovery_suggestions(),
            NarratorError::File(_) => vec![
                "Check file permissions".to_string(),
                "Try the operation again".to_string(),
            ],
            NarratorError::Decode(err) => err.recovery_suggestions(),
            NarratorError::Service(err) => err.recovery_suggestions(),
            NarratorError::Config(err) => err.recovery_suggestions(),
            NarratorError::Catalog(err) => err.recovery_suggestions(),
            NarratorError::Progress(err) => err.recovery_suggestions(),
            NarratorError::Parse(_) => vec!["Type 'help' to see available commands".to_string()],
        }
    }

    /// Check if the user can simply try again
    pub fn is_recoverable(&self) -> bool {
        match self {
            NarratorError::Audio(err) => err.is_recoverable(),
            NarratorError::File(_) => false,
            NarratorError::Decode(_) => true, // Affects a single verse only
            NarratorError::Service(err) => !err.is_fatal(),
            NarratorError::Config(_) => true,
            NarratorError::Catalog(_) => false,
            NarratorError::Progress(_) => true,
            NarratorError::Parse(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            NarratorError::Audio(AudioError::InvalidTransition { .. }) => ErrorSeverity::Info,
            NarratorError::Audio(AudioError::DeviceNotFound { .. }) => ErrorSeverity::Error,
            NarratorError::Audio(_) => ErrorSeverity::Critical,
            NarratorError::File(_) => ErrorSeverity::Error,
            NarratorError::Decode(_) => ErrorSeverity::Warning,
            NarratorError::Service(ServiceError::TransientNetwork(_)) => ErrorSeverity::Warning,
            NarratorError::Service(_) => ErrorSeverity::Error,
            NarratorError::Config(_) => ErrorSeverity::Warning,
            NarratorError::Catalog(_) => ErrorSeverity::Info,
            NarratorError::Progress(_) => ErrorSeverity::Warning,
            NarratorError::Parse(_) => ErrorSeverity::Info,
        }
    }

    fn format_file_error(err: &std::io::Error) -> String {
        match err.kind() {
            std::io::ErrorKind::NotFound => "File or directory not found".to_string(),
            std::io::ErrorKind::PermissionDenied => "Permission denied - cannot access file".to_string(),
            _ => format!("File system error: {}", err),
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Audio output errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Audio initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Unsupported playback rate: {rate}")]
    UnsupportedRate { rate: f32 },

    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },
}

impl AudioError {
    pub fn user_message(&self) -> String {
        match self {
            AudioError::DeviceNotFound { device } => {
                format!("Audio device '{}' is not available or has been disconnected", device)
            }
            AudioError::StreamError(msg) => format!("Audio playback interrupted: {}", msg),
            AudioError::InitializationFailed(msg) => {
                format!("Failed to initialize audio system: {}", msg)
            }
            AudioError::UnsupportedRate { rate } => {
                format!("Reading speed {:.1}x is not one of the available speeds", rate)
            }
            AudioError::InvalidTransition { action, state } => {
                format!("Cannot {} right now (narration is {})", action, state)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            AudioError::DeviceNotFound { .. } => vec![
                "Use 'devices' to see available audio devices".to_string(),
                "Check that your audio device is connected and powered on".to_string(),
            ],
            AudioError::StreamError(_) => vec![
                "Stop and play again to restart the audio stream".to_string(),
                "Check audio device connections".to_string(),
            ],
            AudioError::InitializationFailed(_) => vec![
                "Restart the application".to_string(),
                "Check that no other application holds exclusive audio access".to_string(),
            ],
            AudioError::UnsupportedRate { .. } => vec![
                "Available speeds: 0.8, 1.0, 1.1, 1.3, 1.5, 1.7".to_string(),
            ],
            AudioError::InvalidTransition { .. } => vec![
                "Use 'status' to see the current narration state".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            AudioError::DeviceNotFound { .. } => true,  // Can fall back to default device
            AudioError::StreamError(_) => true,
            AudioError::InitializationFailed(_) => true,
            AudioError::UnsupportedRate { .. } => false,
            AudioError::InvalidTransition { .. } => true,
        }
    }
}

/// Speech payload decoding errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Payload of {len} bytes is not a whole number of {frame_size}-byte frames")]
    MisalignedPayload { len: usize, frame_size: usize },

    #[error("Payload contains no audio frames")]
    EmptyPayload,

    #[error("Invalid transport encoding: {0}")]
    InvalidEncoding(String),

    #[error("Cannot allocate buffer for {frames} frames")]
    AllocationFailed { frames: usize },
}

impl DecodeError {
    pub fn user_message(&self) -> String {
        match self {
            DecodeError::MisalignedPayload { .. } => {
                "Received speech audio was truncated and could not be played".to_string()
            }
            DecodeError::EmptyPayload => "Received speech audio was empty".to_string(),
            DecodeError::InvalidEncoding(msg) => {
                format!("Received speech audio was not valid: {}", msg)
            }
            DecodeError::AllocationFailed { frames } => {
                format!("Not enough memory to prepare {} audio frames", frames)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        vec!["The verse is skipped; narration continues with the next verse".to_string()]
    }
}

/// Errors reported by the remote text and speech service
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Service rejected the request: {0}")]
    AuthOrQuota(String),

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// Auth/quota rejections and malformed responses will not go away by asking again.
    pub fn is_fatal(&self) -> bool {
        match self {
            ServiceError::TransientNetwork(_) => false,
            ServiceError::AuthOrQuota(_) => true,
            ServiceError::MalformedResponse(_) => true,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ServiceError::TransientNetwork(_) => {
                "Could not reach the service. Check your internet connection and try again".to_string()
            }
            ServiceError::AuthOrQuota(_) => {
                "The API key is invalid or the request was refused. Check the key's project billing settings".to_string()
            }
            ServiceError::MalformedResponse(_) => {
                "The service returned a response in an unexpected format".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ServiceError::TransientNetwork(_) => vec![
                "Press play again to retry".to_string(),
                "Check your internet connection".to_string(),
            ],
            ServiceError::AuthOrQuota(_) => vec![
                "Set a valid key in config.toml or the GEMINI_API_KEY environment variable".to_string(),
                "Check the quota and billing of the key's project".to_string(),
            ],
            ServiceError::MalformedResponse(_) => vec![
                "Try opening the chapter again later".to_string(),
            ],
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::IoError(err) => format!("Cannot access configuration file: {}", err),
            ConfigError::SerializationError(_) => "Failed to save configuration settings".to_string(),
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
            ConfigError::InvalidValue { field, value } => {
                format!("'{}' is not a valid value for {}", value, field)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your home directory".to_string(),
                "Try creating the directory manually: ~/.config/scripture-narrator/".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Configuration will use default values".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
            ConfigError::InvalidValue { .. } => vec![
                "Available speeds: 0.8, 1.0, 1.1, 1.3, 1.5, 1.7".to_string(),
            ],
        }
    }
}

/// Book and chapter lookup errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Unknown book: {book}")]
    UnknownBook { book: String },

    #[error("{book} has {chapters} chapters, not {chapter}")]
    ChapterOutOfRange { book: String, chapter: u32, chapters: u32 },
}

impl CatalogError {
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::UnknownBook { book } => format!("There is no book named '{}'", book),
            CatalogError::ChapterOutOfRange { book, chapter, chapters } => {
                format!("{} has chapters 1 to {}; chapter {} does not exist", book, chapters, chapter)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            CatalogError::UnknownBook { .. } => vec![
                "Use the Korean book name, e.g. '창세기' or '요한복음'".to_string(),
                "Use 'progress' to list all books".to_string(),
            ],
            CatalogError::ChapterOutOfRange { .. } => vec![
                "Chapter numbers start from 1".to_string(),
            ],
        }
    }
}

/// Read-progress persistence errors
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ProgressError {
    pub fn user_message(&self) -> String {
        match self {
            ProgressError::IoError(err) => format!("Cannot save reading progress: {}", err),
            ProgressError::SerializationError(_) => {
                "Reading progress could not be encoded for saving".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        vec![
            "Check file permissions for the progress file".to_string(),
            "Progress is kept in memory until the next successful save".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_narrator_error_from_service_error() {
        let service_error = ServiceError::AuthOrQuota("403".to_string());
        let narrator_error: NarratorError = service_error.into();

        match narrator_error {
            NarratorError::Service(ServiceError::AuthOrQuota(msg)) => {
                assert_eq!(msg, "403");
            }
            _ => panic!("Expected Service error variant"),
        }
    }

    #[test]
    fn test_narrator_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let narrator_error: NarratorError = io_error.into();
        assert!(matches!(narrator_error, NarratorError::File(_)));
    }

    #[test]
    fn test_narrator_error_from_decode_error() {
        let narrator_error: NarratorError = DecodeError::EmptyPayload.into();
        assert!(matches!(narrator_error, NarratorError::Decode(DecodeError::EmptyPayload)));
        assert!(narrator_error.is_recoverable());
        assert_eq!(narrator_error.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_service_error_classification() {
        assert!(!ServiceError::TransientNetwork("timeout".to_string()).is_fatal());
        assert!(ServiceError::AuthOrQuota("401".to_string()).is_fatal());
        assert!(ServiceError::MalformedResponse("no verses".to_string()).is_fatal());

        let transient: NarratorError = ServiceError::TransientNetwork("timeout".to_string()).into();
        assert!(transient.is_recoverable());
        assert_eq!(transient.severity(), ErrorSeverity::Warning);

        let fatal: NarratorError = ServiceError::AuthOrQuota("401".to_string()).into();
        assert!(!fatal.is_recoverable());
        assert_eq!(fatal.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_decode_error_display() {
        let error = DecodeError::MisalignedPayload { len: 5, frame_size: 2 };
        assert_eq!(
            format!("{}", error),
            "Payload of 5 bytes is not a whole number of 2-byte frames"
        );

        let error = DecodeError::InvalidEncoding("bad base64".to_string());
        assert_eq!(format!("{}", error), "Invalid transport encoding: bad base64");

        let error = DecodeError::AllocationFailed { frames: 10 };
        assert_eq!(format!("{}", error), "Cannot allocate buffer for 10 frames");
    }

    #[test]
    fn test_audio_error_display() {
        let error = AudioError::DeviceNotFound {
            device: "Test Device".to_string(),
        };
        assert_eq!(format!("{}", error), "Device not found: Test Device");

        let error = AudioError::UnsupportedRate { rate: 2.0 };
        assert_eq!(format!("{}", error), "Unsupported playback rate: 2");

        let error = AudioError::InvalidTransition {
            action: "pause",
            state: "idle".to_string(),
        };
        assert_eq!(format!("{}", error), "Cannot pause while idle");
    }

    #[test]
    fn test_catalog_error_display() {
        let error = CatalogError::ChapterOutOfRange {
            book: "룻기".to_string(),
            chapter: 5,
            chapters: 4,
        };
        assert_eq!(format!("{}", error), "룻기 has 4 chapters, not 5");
        assert!(error.user_message().contains("1 to 4"));
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::ConfigDirNotFound;
        assert_eq!(format!("{}", error), "Configuration directory not found");

        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied");
        let error = ConfigError::IoError(io_error);
        assert!(format!("{}", error).contains("IO error"));
    }

    #[test]
    fn test_error_chain() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "Config file not found");
        let config_error: ConfigError = io_error.into();
        let narrator_error: NarratorError = config_error.into();

        let error_string = format!("{}", narrator_error);
        assert!(error_string.contains("Configuration error"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied");
        let progress_error = ProgressError::IoError(io_error);
        let narrator_error = NarratorError::Progress(progress_error);

        let mut current_error: &dyn Error = &narrator_error;
        let mut error_count = 0;

        while let Some(source) = current_error.source() {
            current_error = source;
            error_count += 1;
        }

        assert!(error_count >= 1);
    }

    #[test]
    fn test_severity_log_levels() {
        assert_eq!(ErrorSeverity::Info.log_level(), log::Level::Info);
        assert_eq!(ErrorSeverity::Critical.log_level(), log::Level::Error);
        assert_eq!(ErrorSeverity::Warning.as_str(), "WARNING");
    }
}
