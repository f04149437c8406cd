use thiserror::Error;

/// Errors shared across the CineGrid workspace.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is missing, unparseable, or fails validation
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },
}

impl CoreError {
    /// Configuration error with the offending environment key attached.
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        CoreError::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}
