use core_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    /// Collection parameters conflict with what the engine already holds,
    /// or local configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The engine could not be reached or failed at the transport level.
    #[error("Vector engine unavailable: {0}")]
    Connectivity(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The engine answered but did not complete the write.
    #[error("Write rejected by vector engine: {0}")]
    Rejected(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VoiceResult<T> = Result<T, VoiceError>;

impl VoiceError {
    pub fn collection_not_found(name: &str) -> Self {
        VoiceError::NotFound(format!("collection '{}' does not exist", name))
    }

    pub fn dimension_mismatch(expected: u32, got: usize) -> Self {
        VoiceError::Validation(format!(
            "vector has {} dimensions, collection expects {}",
            got, expected
        ))
    }
}

impl From<ConfigError> for VoiceError {
    fn from(err: ConfigError) -> Self {
        VoiceError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VoiceError {
    fn from(err: serde_json::Error) -> Self {
        VoiceError::Internal(format!("JSON error: {}", err))
    }
}
