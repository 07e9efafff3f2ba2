//! Error types for the Voxqueue engine.

/// Result type alias for Voxqueue operations
pub type VoxqueueResult<T> = Result<T, VoxqueueError>;

/// Main error type for Voxqueue operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VoxqueueError {
    /// Malformed base64 or PCM payload
    #[error("Decode error: {message}")]
    DecodeError {
        /// Error message describing the decode failure
        message: String,
    },

    /// Remote synthesis failed (credentials, network, or empty payload)
    #[error("{message}")]
    GatewayError {
        /// Error message describing the gateway failure
        message: String,
    },

    /// A precondition of the requested operation was not met
    #[error("Validation error: {message}")]
    ValidationError {
        /// Error message describing the invalid input
        message: String,
    },

    /// Audio device or playback error
    #[error("Playback error: {message}")]
    PlaybackError {
        /// Error message describing the playback issue
        message: String,
    },

    /// Zip archive encoding error
    #[error("Archive error: {message}")]
    ArchiveError {
        /// Error message describing the archive failure
        message: String,
    },

    /// Audio format or processing error
    #[error("Audio processing error: {message}")]
    AudioProcessingError {
        /// Error message describing the processing issue
        message: String,
    },

    /// File I/O error
    #[error("File I/O error: {message}")]
    FileError {
        /// Error message describing the file operation failure
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Voice not found error
    #[error("Voice '{voice_id}' not found")]
    VoiceNotFound {
        /// The voice ID that was not found
        voice_id: String,
    },

    /// Single-flight violation
    #[error("Concurrency error: {message}")]
    ConcurrencyError {
        /// Error message describing the concurrency issue
        message: String,
    },
}

impl VoxqueueError {
    /// Create a new decode error
    #[must_use]
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::DecodeError {
            message: message.into(),
        }
    }

    /// Create a new gateway error
    #[must_use]
    pub fn gateway<S: Into<String>>(message: S) -> Self {
        Self::GatewayError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    #[must_use]
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Create a new playback error
    #[must_use]
    pub fn playback<S: Into<String>>(message: S) -> Self {
        Self::PlaybackError {
            message: message.into(),
        }
    }

    /// Create a new archive error
    #[must_use]
    pub fn archive<S: Into<String>>(message: S) -> Self {
        Self::ArchiveError {
            message: message.into(),
        }
    }

    /// Create a new audio processing error
    #[must_use]
    pub fn audio_processing<S: Into<String>>(message: S) -> Self {
        Self::AudioProcessingError {
            message: message.into(),
        }
    }

    /// Create a new file error
    #[must_use]
    pub fn file<S: Into<String>>(message: S) -> Self {
        Self::FileError {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new voice not found error
    #[must_use]
    pub fn voice_not_found<S: Into<String>>(voice_id: S) -> Self {
        Self::VoiceNotFound {
            voice_id: voice_id.into(),
        }
    }

    /// Create a new concurrency error
    #[must_use]
    pub fn concurrency<S: Into<String>>(message: S) -> Self {
        Self::ConcurrencyError {
            message: message.into(),
        }
    }

    /// Check if this error is due to invalid user input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationError { .. }
                | Self::VoiceNotFound { .. }
                | Self::ConfigurationError { .. }
        )
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::DecodeError { .. } => "decode",
            Self::GatewayError { .. } => "gateway",
            Self::ValidationError { .. } => "validation",
            Self::PlaybackError { .. } => "playback",
            Self::ArchiveError { .. } => "archive",
            Self::AudioProcessingError { .. } => "audio_processing",
            Self::FileError { .. } => "file",
            Self::ConfigurationError { .. } => "configuration",
            Self::VoiceNotFound { .. } => "voice",
            Self::ConcurrencyError { .. } => "concurrency",
        }
    }
}

impl From<std::io::Error> for VoxqueueError {
    fn from(err: std::io::Error) -> Self {
        Self::file(err.to_string())
    }
}

impl From<base64::DecodeError> for VoxqueueError {
    fn from(err: base64::DecodeError) -> Self {
        Self::decode(format!("invalid base64 payload: {err}"))
    }
}

impl From<zip::result::ZipError> for VoxqueueError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::archive(err.to_string())
    }
}

impl From<reqwest::Error> for VoxqueueError {
    fn from(err: reqwest::Error) -> Self {
        Self::gateway(format!("request to synthesis service failed: {err}"))
    }
}

impl From<toml::de::Error> for VoxqueueError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("invalid TOML: {err}"))
    }
}

impl From<tokio::task::JoinError> for VoxqueueError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::concurrency(format!("background task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VoxqueueError::voice_not_found("Kore");
        assert_eq!(err.to_string(), "Voice 'Kore' not found");

        // Gateway messages are recorded verbatim on queue items
        let err = VoxqueueError::gateway("no audio data received");
        assert_eq!(err.to_string(), "no audio data received");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(VoxqueueError::decode("test").category(), "decode");
        assert_eq!(VoxqueueError::gateway("test").category(), "gateway");
        assert_eq!(VoxqueueError::validation("test").category(), "validation");
        assert_eq!(VoxqueueError::playback("test").category(), "playback");
        assert_eq!(VoxqueueError::archive("test").category(), "archive");
        assert_eq!(VoxqueueError::audio_processing("test").category(), "audio_processing");
        assert_eq!(VoxqueueError::file("test").category(), "file");
        assert_eq!(VoxqueueError::configuration("test").category(), "configuration");
        assert_eq!(VoxqueueError::voice_not_found("test").category(), "voice");
        assert_eq!(VoxqueueError::concurrency("test").category(), "concurrency");
    }

    #[test]
    fn test_user_errors() {
        assert!(VoxqueueError::validation("test").is_user_error());
        assert!(VoxqueueError::voice_not_found("test").is_user_error());
        assert!(VoxqueueError::configuration("test").is_user_error());
        assert!(!VoxqueueError::gateway("test").is_user_error());
        assert!(!VoxqueueError::playback("test").is_user_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err = VoxqueueError::from(io_err);
        assert!(matches!(err, VoxqueueError::FileError { .. }));
    }

    #[test]
    fn test_from_base64_error() {
        let err = VoxqueueError::from(base64::DecodeError::InvalidLength(3));
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn test_error_equality() {
        let err1 = VoxqueueError::gateway("test message");
        let err2 = VoxqueueError::gateway("test message");
        let err3 = VoxqueueError::gateway("different message");

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
